//! End-to-end client tests against a scripted chassis over real TCP.

use std::time::Duration;

use zappy_core::{Command, Error};
use zappy_protocol::protocol::Outcome;
use zappy_protocol::telnet::{DO, IAC, WILL};
use zappy_protocol::validate::validate_str;
use zappy_protocol::{ChassisBuilder, ChassisClient};
use zappy_test_harness::MockChassis;

fn client_for(chassis: &MockChassis, reply_timeout: Duration) -> ChassisClient {
    let (host, port) = chassis
        .addr()
        .rsplit_once(':')
        .expect("mock address has a port");
    ChassisBuilder::new(host)
        .port(port.parse().expect("numeric port"))
        .reply_timeout(reply_timeout)
        .build()
        .expect("valid client settings")
}

#[tokio::test]
async fn zap_json_to_pass() {
    let mut chassis = MockChassis::bind().await.unwrap();
    chassis.expect(
        b"zap 1 6 500.0 11000.0 16000.0 0\n\r",
        b"charging...\r\nfiring r2c7\r\nzpass\r\n",
    );
    let client = client_for(&chassis, Duration::from_secs(5));
    chassis.start();

    let cmd = validate_str(
        r#"{"name": "Zappy.zap", "voltage": "500:volts", "duration": "10:milliseconds",
            "option": {"row": 2, "col": 7}}"#,
        client.limits(),
    )
    .unwrap()
    .value;

    let reply = client.execute(&cmd).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Pass);
    assert_eq!(reply.raw_text, "charging...\r\nfiring r2c7\r\nzpass");

    chassis.wait().await.unwrap();
}

#[tokio::test]
async fn unlock_rejected() {
    let mut chassis = MockChassis::bind().await.unwrap();
    chassis.expect(b"plate unlock\n\r", b"interlock open zerr\r\n");
    let client = client_for(&chassis, Duration::from_secs(5));
    chassis.start();

    let reply = client.execute(&Command::Unlock).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Fail);
    match reply.into_result() {
        Err(Error::ChassisRejected(text)) => assert_eq!(text, "interlock open zerr"),
        other => panic!("expected ChassisRejected, got {:?}", other),
    }

    chassis.wait().await.unwrap();
}

#[tokio::test]
async fn silent_chassis_times_out_and_connection_closes() {
    let mut chassis = MockChassis::bind().await.unwrap();
    chassis.expect_silence(b"plate lock\n\r");
    let client = client_for(&chassis, Duration::from_millis(200));
    chassis.start();

    let reply = client.execute(&Command::Lock).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Timeout);
    assert_eq!(reply.diagnostic(), "status return timeout");

    // The mock only finishes once the client has hung up.
    chassis.wait().await.unwrap();
}

#[tokio::test]
async fn telnet_negotiation_greeting_is_refused() {
    let mut chassis = MockChassis::bind().await.unwrap();
    chassis.greeting(&[IAC, DO, 1, IAC, WILL, 3]);
    chassis.expect(b"plate lock\n\r", b"locked\r\nzpass\r\n");
    let client = client_for(&chassis, Duration::from_secs(5));
    chassis.start();

    let reply = client.execute(&Command::Lock).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Pass);
    assert_eq!(reply.raw_text, "locked\r\nzpass");

    chassis.wait().await.unwrap();
}

#[tokio::test]
async fn partial_reply_without_token_times_out() {
    let mut chassis = MockChassis::bind().await.unwrap();
    chassis.expect(b"plate lock\n\r", b"working");
    let client = client_for(&chassis, Duration::from_millis(200));
    chassis.start();

    let reply = client.execute(&Command::Lock).await.unwrap();
    assert_eq!(reply.outcome, Outcome::Timeout);
    assert_eq!(reply.raw_text, "working");

    chassis.wait().await.unwrap();
}
