//! Integration tests for loading and saving the settings file.

use chess_duel::{
    AudioLevel, DEFAULT_HOST, DEFAULT_PORT, MAX_VOLUME, PeerAddress, Settings, WindowSize,
};

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");

    let settings = Settings::load(dir.path().join("absent.toml")).expect("defaults");

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.address(), &PeerAddress::new(DEFAULT_HOST, DEFAULT_PORT));
    assert_eq!(settings.window_size(), &WindowSize::default());
    assert_eq!(settings.audio(), &AudioLevel::default());
}

#[test]
fn test_settings_round_trip_through_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("chess_duel.toml");
    let settings = Settings::new(
        PeerAddress::new("192.168.0.10", 6000),
        WindowSize {
            width: 100,
            height: 30,
        },
        AudioLevel {
            volume: 40,
            muted: true,
        },
    );

    settings.save(&path).expect("save settings");
    let loaded = Settings::load(&path).expect("load settings");

    assert_eq!(loaded, settings);
}

#[test]
fn test_address_is_stored_as_host_port_pair() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chess_duel.toml");
    let mut settings = Settings::default();
    settings.set_address(PeerAddress::new("peer.local", 5001));

    settings.save(&path).expect("save settings");
    let text = std::fs::read_to_string(&path).expect("read back");
    let value: toml::Value = toml::from_str(&text).expect("valid toml");

    let address = value["address"].as_array().expect("address array");
    assert_eq!(address[0].as_str(), Some("peer.local"));
    assert_eq!(address[1].as_integer(), Some(5001));
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chess_duel.toml");
    std::fs::write(&path, "address = [\"10.0.0.2\", 7000]\n").expect("write file");

    let settings = Settings::load(&path).expect("load settings");

    assert_eq!(settings.address(), &PeerAddress::new("10.0.0.2", 7000));
    assert_eq!(settings.window_size(), &WindowSize::default());
    assert_eq!(settings.audio(), &AudioLevel::default());
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chess_duel.toml");
    std::fs::write(&path, "address = \"not a pair\"\n").expect("write file");

    let err = Settings::load(&path).expect_err("malformed settings");

    assert!(err.message.contains("Failed to parse settings"));
}

#[test]
fn test_audio_level_steps_and_mute() {
    let audio = AudioLevel::default();

    assert_eq!(audio.raise().volume, 100);
    assert_eq!(audio.lower().volume, 90);
    assert_eq!(AudioLevel { volume: 5, muted: false }.lower().volume, 0);

    let muted = audio.toggle_mute();
    assert!(muted.muted);
    assert_eq!(muted.effective_volume(), 0);
    assert_eq!(muted.toggle_mute().effective_volume(), 100);
}

#[test]
fn test_peer_address_display() {
    assert_eq!(PeerAddress::new("127.0.0.1", 5000).to_string(), "127.0.0.1:5000");
}

#[test]
fn test_out_of_range_volume_is_clamped_on_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chess_duel.toml");
    std::fs::write(&path, "[audio]\nvolume = 250\nmuted = true\n").expect("write settings");

    let settings = Settings::load(&path).expect("load settings");

    assert_eq!(
        settings.audio(),
        &AudioLevel {
            volume: MAX_VOLUME,
            muted: true
        }
    );
}
