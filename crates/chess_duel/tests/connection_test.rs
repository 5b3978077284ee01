//! Integration tests for the connection session: retries, liveness and move
//! exchange over in-memory and TCP links.

mod common;

use std::sync::Arc;

use chess_duel::{
    ConnectionSession, Connector, MoveExchange, PeerAddress, RetryPolicy, Role, SessionError,
    SessionState, TcpConnector,
};
use common::{
    ScriptedConnector, StalledConnector, fast_policy, mv, peer_recv, peer_send, test_address,
    wait_until,
};
use tokio::time::{Duration, Instant, sleep};

#[tokio::test]
async fn test_connect_succeeds_after_failed_attempts() {
    for failures in [0, 1, 4, 9] {
        let connector = Arc::new(ScriptedConnector::succeed_after(failures));
        let mut session = ConnectionSession::new(connector.clone());

        let connected = session
            .connect(Role::Join, test_address(), fast_policy())
            .await;

        assert!(connected, "should connect after {failures} failures");
        assert_eq!(session.attempts(), failures + 1);
        assert_eq!(connector.attempts(), failures + 1);
        assert!(session.is_connected());
        assert_eq!(session.state(), SessionState::Connected);
    }
}

#[tokio::test]
async fn test_connect_gives_up_after_ten_attempts() {
    let connector = Arc::new(ScriptedConnector::refusing());
    let mut session = ConnectionSession::new(connector.clone());

    let connected = session
        .connect(Role::Host, test_address(), fast_policy())
        .await;

    assert!(!connected);
    assert_eq!(session.attempts(), 10);
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!session.is_connected());

    sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts(), 10, "no attempts after giving up");
}

#[tokio::test]
async fn test_timed_out_attempt_counts_as_failure() {
    let connector = Arc::new(StalledConnector::default());
    let mut session = ConnectionSession::new(connector.clone());
    let policy = RetryPolicy::new(Duration::from_millis(20), 3);

    let connected = session.connect(Role::Join, test_address(), policy).await;

    assert!(!connected);
    assert_eq!(session.attempts(), 3);
    assert_eq!(connector.attempts(), 3);
}

#[tokio::test]
async fn test_failed_attempts_are_paced_by_timeout() {
    let connector = Arc::new(ScriptedConnector::refusing());
    let mut session = ConnectionSession::new(connector);
    let policy = RetryPolicy::new(Duration::from_millis(20), 3);

    let started = Instant::now();
    session.connect(Role::Join, test_address(), policy).await;

    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_not_connected_before_connect() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let session = ConnectionSession::new(connector);

    assert!(!session.is_connected());
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.send(mv((4, 1), (4, 3))), Err(SessionError::NotConnected));
    assert_eq!(session.recv(), Err(SessionError::NotConnected));
    assert!(session.move_link().is_none());
}

#[tokio::test]
async fn test_close_is_final_and_idempotent() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector.clone());
    assert!(
        session
            .connect(Role::Host, test_address(), fast_policy())
            .await
    );

    session.close();
    session.close();

    assert_eq!(session.state(), SessionState::Closed);
    for _ in 0..3 {
        assert!(!session.is_connected());
        assert_eq!(session.send(mv((4, 1), (4, 3))), Err(SessionError::NotConnected));
        assert_eq!(session.recv(), Err(SessionError::NotConnected));
    }

    let reconnected = session
        .connect(Role::Host, test_address(), fast_policy())
        .await;
    assert!(!reconnected, "a closed session is never reused");
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_close_on_never_opened_session() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector);

    session.close();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_moves_round_trip_in_order() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector.clone());
    assert!(
        session
            .connect(Role::Host, test_address(), fast_policy())
            .await
    );
    let mut peer = connector.take_peer();

    let outgoing = [mv((4, 1), (4, 3)), mv((6, 0), (5, 2)), mv((5, 0), (2, 3))];
    for m in outgoing {
        session.send(m).expect("send while connected");
    }
    for expected in outgoing {
        assert_eq!(peer_recv(&mut peer).await, expected);
    }

    let incoming = [mv((4, 6), (4, 4)), mv((1, 7), (2, 5))];
    for m in incoming {
        peer_send(&mut peer, m).await;
    }
    let mut received = Vec::new();
    let done = wait_until(|| {
        if let Ok(Some(m)) = session.recv() {
            received.push(m);
        }
        received.len() == incoming.len()
    })
    .await;

    assert!(done, "both moves should arrive");
    assert_eq!(received, incoming);
    assert_eq!(session.recv(), Ok(None));
}

#[tokio::test]
async fn test_peer_eof_collapses_liveness() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector.clone());
    assert!(
        session
            .connect(Role::Join, test_address(), fast_policy())
            .await
    );
    let link = session.move_link().expect("link while connected");

    connector.drop_peers();

    assert!(wait_until(|| !session.is_connected()).await);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.send(mv((4, 6), (4, 4))), Err(SessionError::NotConnected));
    assert!(!link.is_alive());
}

#[tokio::test]
async fn test_moves_sent_before_peer_eof_are_still_received() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector.clone());
    assert!(
        session
            .connect(Role::Join, test_address(), fast_policy())
            .await
    );
    let mut peer = connector.take_peer();
    let last = mv((3, 0), (4, 7));

    peer_send(&mut peer, last).await;
    drop(peer);

    assert!(wait_until(|| !session.is_connected()).await);
    assert_eq!(session.buffered_moves(), 1);
    assert_eq!(session.recv(), Ok(Some(last)));
    assert_eq!(session.recv(), Err(SessionError::NotConnected));
}

#[tokio::test]
async fn test_close_discards_unread_moves() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector.clone());
    assert!(
        session
            .connect(Role::Host, test_address(), fast_policy())
            .await
    );
    let link = session.move_link().expect("link while connected");
    let mut peer = connector.take_peer();

    peer_send(&mut peer, mv((4, 6), (4, 4))).await;
    assert!(wait_until(|| session.buffered_moves() == 1).await);
    session.close();

    assert_eq!(session.recv(), Err(SessionError::NotConnected));
    assert_eq!(link.try_recv(), Err(SessionError::NotConnected));
    assert_eq!(link.buffered(), 0);
}

#[tokio::test]
async fn test_close_disables_move_links() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector);
    assert!(
        session
            .connect(Role::Join, test_address(), fast_policy())
            .await
    );
    let mut link = session.move_link().expect("link while connected");
    assert!(link.is_connected());

    session.close();

    assert!(!link.is_connected());
    assert!(!link.send_move(mv((4, 6), (4, 4))));
    assert_eq!(link.receive_move(), None);
}

#[tokio::test]
async fn test_dropping_session_closes_the_link() {
    let connector = Arc::new(ScriptedConnector::succeed_after(0));
    let mut session = ConnectionSession::new(connector.clone());
    assert!(
        session
            .connect(Role::Host, test_address(), fast_policy())
            .await
    );
    let mut peer = connector.take_peer();

    drop(session);

    let read = tokio::time::timeout(
        Duration::from_secs(2),
        chess_duel::read_frame::<_, chess_duel::Move>(&mut peer),
    )
    .await
    .expect("peer should see the link close");
    assert!(read.expect_err("no frame after close").is_eof());
}

#[tokio::test]
async fn test_tcp_host_and_join_exchange_moves() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port")
        .port();
    let address = PeerAddress::new("127.0.0.1", port);
    let connector: Arc<dyn Connector> = Arc::new(TcpConnector::new());

    let host_address = address.clone();
    let host_connector = connector.clone();
    let host = tokio::spawn(async move {
        let mut session = ConnectionSession::new(host_connector);
        let connected = session
            .connect(Role::Host, host_address, RetryPolicy::default())
            .await;
        (session, connected)
    });

    sleep(Duration::from_millis(50)).await;
    let mut joiner = ConnectionSession::new(connector);
    assert!(
        joiner
            .connect(Role::Join, address, RetryPolicy::default())
            .await
    );
    let (host, host_connected) = host.await.expect("host task");
    assert!(host_connected);

    let opening = mv((4, 1), (4, 3));
    host.send(opening).expect("host send");
    let mut got = None;
    assert!(
        wait_until(|| {
            got = joiner.recv().ok().flatten();
            got.is_some()
        })
        .await
    );
    assert_eq!(got, Some(opening));

    let reply = mv((4, 6), (4, 4));
    joiner.send(reply).expect("joiner send");
    let mut got = None;
    assert!(
        wait_until(|| {
            got = host.recv().ok().flatten();
            got.is_some()
        })
        .await
    );
    assert_eq!(got, Some(reply));
}
