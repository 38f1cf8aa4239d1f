#[path = "support/fake_gateway.rs"]
mod fake_gateway;

use std::sync::Arc;

use fake_gateway::{dev_config, FakeGateway, FixedSession, FunctionTemplate};
use sapconn::{Command, Connection, ConnectorError, Session, SessionProvider};

fn open_connection(gateway: &FakeGateway) -> Connection<'_, FakeGateway> {
    let mut conn = Connection::new(gateway, &dev_config()).unwrap();
    conn.open().unwrap();
    gateway.clear_journal();
    conn
}

#[test]
fn calls_run_inside_one_context() {
    let gateway = FakeGateway::new()
        .with_function("BAPI_TRANSACTION_COMMIT", FunctionTemplate::new().parameter("WAIT"));
    let conn = open_connection(&gateway);

    let mut session = Session::new(&conn);
    session.start_session().unwrap();
    assert!(session.is_active());
    Command::with_connection("BAPI_TRANSACTION_COMMIT", &conn)
        .parameter("WAIT", "X")
        .execute_rfc()
        .unwrap();
    session.end_session().unwrap();
    assert!(!session.is_active());

    assert_eq!(
        gateway.journal(),
        vec![
            "begin context DEV",
            "create BAPI_TRANSACTION_COMMIT",
            "bind BAPI_TRANSACTION_COMMIT.WAIT",
            "invoke BAPI_TRANSACTION_COMMIT",
            "end context DEV",
        ]
    );
}

#[test]
fn provider_is_registered_for_the_session() {
    let gateway = FakeGateway::new();
    let conn = open_connection(&gateway);
    let provider: Arc<dyn SessionProvider> = Arc::new(FixedSession("web-42"));

    let mut session = Session::with_provider(&conn, provider);
    session.start_session().unwrap();
    assert!(gateway.has_provider());

    session.end_session().unwrap();
    assert!(!gateway.has_provider());
    assert!(session.provider().is_none());
    assert_eq!(
        gateway.journal(),
        vec![
            "register provider web-42",
            "begin context DEV",
            "unregister provider web-42",
            "end context DEV",
        ]
    );
}

#[test]
fn ending_an_idle_session_does_nothing() {
    let gateway = FakeGateway::new();
    let conn = open_connection(&gateway);

    let mut session = Session::new(&conn);
    session.end_session().unwrap();
    session.end_session().unwrap();
    assert!(gateway.journal().is_empty());
}

#[test]
fn dropping_a_session_unregisters_the_provider_only() {
    let gateway = FakeGateway::new();
    let conn = open_connection(&gateway);

    {
        let mut session =
            Session::with_provider(&conn, Arc::new(FixedSession("web-7")) as Arc<dyn SessionProvider>);
        session.start_session().unwrap();
    }

    assert!(!gateway.has_provider());
    assert_eq!(
        gateway.journal(),
        vec![
            "register provider web-7",
            "begin context DEV",
            "unregister provider web-7",
        ]
    );
}

#[test]
fn dropping_a_session_survives_a_failed_unregistration() {
    let gateway = FakeGateway::new();
    let conn = open_connection(&gateway);

    {
        let mut session =
            Session::with_provider(&conn, Arc::new(FixedSession("web-9")) as Arc<dyn SessionProvider>);
        session.start_session().unwrap();
        gateway.set_fail_unregister(true);
    }

    let journal = gateway.journal();
    assert_eq!(journal.last().map(String::as_str), Some("unregister provider web-9"));
    assert!(!journal.iter().any(|e| e.starts_with("end context")));
}

#[test]
fn provider_cannot_be_replaced_while_registered() {
    let gateway = FakeGateway::new();
    let conn = open_connection(&gateway);

    let mut session = Session::with_provider(&conn, Arc::new(FixedSession("a")));
    session.start_session().unwrap();
    assert!(matches!(
        session.set_provider(Some(Arc::new(FixedSession("b")))),
        Err(ConnectorError::Configuration(_))
    ));
    session.end_session().unwrap();
    session.set_provider(Some(Arc::new(FixedSession("b")))).unwrap();
}

#[test]
fn refused_context_is_a_session_error() {
    let gateway = FakeGateway::new();
    gateway.set_fail_context(true);
    let conn = open_connection(&gateway);

    let mut session = Session::new(&conn);
    assert!(matches!(
        session.start_session(),
        Err(ConnectorError::Session { .. })
    ));
    assert!(!session.is_active());
}

#[test]
fn session_needs_an_open_connection() {
    let gateway = FakeGateway::new();
    let conn = Connection::new(&gateway, &dev_config()).unwrap();

    let mut session = Session::new(&conn);
    assert!(matches!(
        session.start_session(),
        Err(ConnectorError::Configuration(_))
    ));
}
