//! End-to-end gate scenarios on mock peripherals and paused time.

use std::time::Duration;

use gatekeeper_controller::{ControllerStats, GateController, GateState};
use gatekeeper_core::{GateConfig, VerificationRequest, VerificationResult};
use gatekeeper_hardware::mock::{
    MockPanel, MockPanelHandle, MockSensor, MockSensorHandle, MockServo, MockServoHandle,
};
use gatekeeper_network::mock::{MockChannel, MockChannelHandle, MockReply, MockSerialLink};
use gatekeeper_network::{SerialChannel, VerificationChannel};
use rstest::rstest;
use tokio::time::Instant;

const POLL: Duration = Duration::from_millis(10);
const SETTLE: Duration = Duration::from_millis(1000);
const CLOSED: u16 = 0;
const OPEN: u16 = 90;

// Active-low sensor: raw high means the beam is clear.
const CLEAR: bool = true;
const BLOCKED: bool = false;

struct Rig<C> {
    controller: GateController<MockSensor, C, MockServo, MockPanel>,
    sensor: MockSensorHandle,
    servo: MockServoHandle,
    panel: MockPanelHandle,
}

impl<C: VerificationChannel> Rig<C> {
    async fn start(channel: C, timeout: Duration, initial_level: bool) -> Self {
        let config = GateConfig::default()
            .decision_timeout_override(timeout)
            .poll_period(POLL)
            .settle_delay(SETTLE)
            .angles(CLOSED, OPEN);
        let (sensor, sensor_handle) = MockSensor::new(initial_level);
        let (servo, servo_handle) = MockServo::new();
        let (panel, panel_handle) = MockPanel::new();

        let mut controller = GateController::new(&config, sensor, channel, servo, panel).unwrap();
        controller.initialize().await;

        Self {
            controller,
            sensor: sensor_handle,
            servo: servo_handle,
            panel: panel_handle,
        }
    }

    /// Run loop cycles for at least `duration` of virtual time.
    async fn run_for(&mut self, duration: Duration) {
        let end = Instant::now() + duration;
        while Instant::now() < end {
            self.controller.step().await.unwrap();
            tokio::time::sleep(POLL).await;
        }
    }

    fn arrive(&self) {
        self.sensor.set_level(BLOCKED);
    }

    fn depart(&self) {
        self.sensor.set_level(CLEAR);
    }

    /// Change the sensor level `after` from now, while the controller runs.
    fn schedule(&self, after: Duration, level: bool) {
        let sensor = self.sensor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            sensor.set_level(level);
        });
    }

    fn last_frame(&self) -> Vec<String> {
        self.panel.last_frame().unwrap()
    }

    fn path(&self) -> Vec<GateState> {
        self.controller.machine().history().iter().map(|t| t.to).collect()
    }
}

async fn mock_rig(timeout: Duration) -> (Rig<MockChannel>, MockChannelHandle) {
    let (channel, handle) = MockChannel::new();
    (Rig::start(channel, timeout, CLEAR).await, handle)
}

fn frame(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

fn assert_accounted(stats: ControllerStats) {
    assert_eq!(
        stats.grants + stats.denials + stats.timeouts + stats.transport_failures,
        stats.attempts
    );
}

/// Never answers and ignores the timeout it is given.
struct UnresponsiveChannel;

impl VerificationChannel for UnresponsiveChannel {
    async fn request_decision(
        &mut self,
        _request: &VerificationRequest,
        _timeout: Duration,
    ) -> gatekeeper_network::Result<VerificationResult> {
        std::future::pending().await
    }

    async fn maintain_link(&mut self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "unresponsive"
    }
}

#[tokio::test(start_paused = true)]
async fn test_startup_closes_barrier_and_welcomes() {
    let (rig, handle) = mock_rig(Duration::from_secs(5)).await;

    assert!(rig.panel.is_initialized());
    assert_eq!(rig.panel.frames()[0], frame(&["Welcome"]));
    assert_eq!(rig.servo.commands(), vec![CLOSED]);
    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(handle.requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_grant_then_departure_closes() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push_after(Duration::from_millis(300), MockReply::Grant(Some("29A12345".into())));

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Granted);
    assert_eq!(rig.servo.last_angle(), Some(OPEN));
    assert!(rig.panel.has_shown("checking"));
    assert_eq!(rig.last_frame(), frame(&["ACCEPT", "", "29A12345"]));

    rig.depart();
    let departed = Instant::now();
    rig.run_for(Duration::from_millis(100)).await;

    assert!(departed.elapsed() >= SETTLE);
    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.commands(), vec![CLOSED, OPEN, CLOSED]);
    assert!(rig.panel.has_shown("Closing"));
    assert_eq!(rig.last_frame(), frame(&["Ready"]));
    assert_eq!(
        rig.path(),
        vec![
            GateState::Checking,
            GateState::Granted,
            GateState::Closing,
            GateState::Idle
        ]
    );

    let stats = rig.controller.stats();
    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.grants, 1);
    assert_accounted(stats);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_deny_keeps_barrier_closed() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push(MockReply::Deny(Some("51F00001".into())));

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.count(OPEN), 0);
    assert_eq!(rig.last_frame(), frame(&["DENY", "", "51F00001"]));
    assert_eq!(
        rig.path(),
        vec![GateState::Checking, GateState::Denied, GateState::Idle]
    );

    // The deny screen holds while the vehicle waits.
    rig.run_for(Duration::from_secs(3)).await;
    assert_eq!(rig.last_frame(), frame(&["DENY", "", "51F00001"]));
    assert_eq!(handle.requests(), 1);

    rig.depart();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(rig.last_frame(), frame(&["Welcome"]));
    assert_eq!(rig.servo.count(OPEN), 0);

    let stats = rig.controller.stats();
    assert_eq!(stats.denials, 1);
    assert_accounted(stats);
}

#[tokio::test(start_paused = true)]
async fn test_serial_no_reply_denies() {
    let (link, link_handle) = MockSerialLink::new();
    link_handle.reply_on_write(b"NOxx\n");
    let channel = SerialChannel::new(link, Duration::from_secs(2));
    let mut rig = Rig::start(channel, Duration::from_secs(5), CLEAR).await;

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(link_handle.written(), vec![b"CAR_DETECTED\n".to_vec()]);
    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.count(OPEN), 0);
    assert_eq!(rig.last_frame(), frame(&["DENY", "", ""]));
    assert_eq!(rig.controller.stats().denials, 1);
}

#[tokio::test(start_paused = true)]
async fn test_serial_ok_reply_grants() {
    let (link, link_handle) = MockSerialLink::new();
    link_handle.reply_on_write(b"OK\n");
    let channel = SerialChannel::new(link, Duration::from_secs(2));
    let mut rig = Rig::start(channel, Duration::from_secs(5), CLEAR).await;

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Granted);
    assert_eq!(rig.servo.last_angle(), Some(OPEN));
    assert_eq!(rig.last_frame(), frame(&["ACCEPT", "", ""]));
}

#[tokio::test(start_paused = true)]
async fn test_silent_service_times_out_within_bound() {
    let timeout = Duration::from_secs(5);
    let (mut rig, handle) = mock_rig(timeout).await;
    handle.push(MockReply::Silent);

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.last_frame(), frame(&["Timeout"]));
    assert_eq!(rig.servo.count(OPEN), 0);
    assert_eq!(handle.timeouts(), vec![timeout]);

    let history = rig.controller.machine().history();
    let checking = history[0].timestamp;
    let denied = history[1].timestamp;
    assert_eq!(history[1].to, GateState::Denied);
    assert!(denied - checking >= timeout);
    assert!(denied - checking <= timeout + POLL);

    let stats = rig.controller.stats();
    assert_eq!(stats.timeouts, 1);
    assert_accounted(stats);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_unresponsive_channel() {
    let timeout = Duration::from_millis(800);
    let mut rig = Rig::start(UnresponsiveChannel, timeout, CLEAR).await;

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.last_frame(), frame(&["Timeout"]));

    let history = rig.controller.machine().history();
    let elapsed = history[1].timestamp - history[0].timestamp;
    assert!(elapsed >= timeout && elapsed <= timeout + POLL);
    assert_eq!(rig.controller.stats().timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_denies() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push(MockReply::Fail("connection refused".into()));

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.count(OPEN), 0);
    assert_eq!(rig.last_frame(), frame(&["DENY", "", ""]));

    let stats = rig.controller.stats();
    assert_eq!(stats.transport_failures, 1);
    assert_accounted(stats);
}

#[rstest]
#[case::rejected(MockReply::Deny(None))]
#[case::rejected_with_plate(MockReply::Deny(Some("51F00001".into())))]
#[case::transport(MockReply::Fail("reset by peer".into()))]
#[case::silent(MockReply::Silent)]
#[tokio::test(start_paused = true)]
async fn test_only_a_grant_opens(#[case] reply: MockReply) {
    let (mut rig, handle) = mock_rig(Duration::from_secs(1)).await;
    handle.push(reply);

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;
    rig.depart();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.servo.count(OPEN), 0);
    assert!(
        rig.controller
            .machine()
            .history()
            .iter()
            .all(|t| t.to != GateState::Granted)
    );
    assert_eq!(rig.controller.state(), GateState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_second_arrival_during_checking_is_ignored() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push_after(Duration::from_secs(2), MockReply::Grant(Some("29A12345".into())));

    rig.arrive();
    rig.schedule(Duration::from_millis(500), CLEAR);
    rig.schedule(Duration::from_millis(1000), BLOCKED);
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(handle.requests(), 1);
    assert_eq!(handle.max_in_flight(), 1);
    assert_eq!(rig.controller.stats().ignored_arrivals, 1);
    assert_eq!(rig.controller.state(), GateState::Granted);

    rig.depart();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(handle.requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_grant_after_vehicle_left_closes_immediately() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push_after(Duration::from_secs(1), MockReply::Grant(None));

    rig.arrive();
    rig.schedule(Duration::from_millis(300), CLEAR);
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.commands(), vec![CLOSED, OPEN, CLOSED]);
    assert_eq!(rig.last_frame(), frame(&["Ready"]));
}

#[rstest]
#[case::rejected(MockReply::Deny(Some("51F00001".into())))]
#[case::transport(MockReply::Fail("connection reset".into()))]
#[case::timeout(MockReply::Silent)]
#[tokio::test(start_paused = true)]
async fn test_deny_after_vehicle_left_returns_to_welcome(#[case] reply: MockReply) {
    let (mut rig, handle) = mock_rig(Duration::from_secs(2)).await;
    handle.push_after(Duration::from_secs(1), reply);

    rig.arrive();
    rig.schedule(Duration::from_millis(300), CLEAR);
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.count(OPEN), 0);
    assert_eq!(rig.last_frame(), frame(&["Welcome"]));
    assert_accounted(rig.controller.stats());

    // The next vehicle starts a fresh attempt from the welcome screen.
    handle.push(MockReply::Grant(None));
    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(rig.controller.state(), GateState::Granted);
    assert_eq!(handle.requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_one_close_per_grant_cycle() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;

    for cycle in 1..=3 {
        handle.push(MockReply::Grant(None));
        rig.arrive();
        rig.run_for(Duration::from_millis(100)).await;
        rig.depart();
        rig.run_for(Duration::from_millis(100)).await;

        assert_eq!(rig.servo.count(OPEN), cycle);
        // One extra close from startup.
        assert_eq!(rig.servo.count(CLOSED), cycle + 1);
    }
    assert_eq!(rig.controller.stats().grants, 3);
}

#[tokio::test(start_paused = true)]
async fn test_sensor_noise_triggers_nothing() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;

    for i in 0..20u64 {
        let level = if i % 2 == 0 { BLOCKED } else { CLEAR };
        rig.schedule(Duration::from_millis(20 * i), level);
    }
    rig.run_for(Duration::from_millis(600)).await;

    assert_eq!(handle.requests(), 0);
    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.controller.stats(), ControllerStats::default());
}

#[tokio::test(start_paused = true)]
async fn test_vehicle_present_at_startup_is_not_an_arrival() {
    let (channel, handle) = MockChannel::new();
    let mut rig = Rig::start(channel, Duration::from_secs(5), BLOCKED).await;

    rig.run_for(Duration::from_millis(500)).await;
    assert_eq!(handle.requests(), 0);

    rig.depart();
    rig.run_for(Duration::from_millis(100)).await;
    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(handle.requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_link_maintained_every_cycle() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    let before = handle.link_checks();

    rig.run_for(Duration::from_millis(100)).await;
    assert!(handle.link_checks() >= before + 10);

    // A down link does not stop the loop or stall arrivals.
    handle.set_link_up(false);
    handle.push(MockReply::Deny(None));
    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(handle.requests(), 1);
    assert_eq!(rig.controller.state(), GateState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_peripheral_failures_do_not_stop_the_gate() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    rig.panel.set_failing(true);
    rig.servo.set_failing(true);
    handle.push(MockReply::Grant(None));

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(rig.controller.state(), GateState::Granted);
    assert!(rig.controller.actuator().failures() >= 1);

    rig.servo.set_failing(false);
    rig.panel.set_failing(false);
    rig.depart();
    rig.run_for(Duration::from_millis(100)).await;

    assert_eq!(rig.controller.state(), GateState::Idle);
    assert_eq!(rig.servo.last_angle(), Some(CLOSED));
    assert_eq!(rig.last_frame(), frame(&["Ready"]));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_open_barrier() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push(MockReply::Grant(Some("29A12345".into())));

    rig.arrive();
    rig.run_for(Duration::from_millis(100)).await;
    assert_eq!(rig.servo.last_angle(), Some(OPEN));

    let stats = rig
        .controller
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await;

    assert_eq!(rig.servo.last_angle(), Some(CLOSED));
    assert_eq!(stats.grants, 1);
    assert_accounted(stats);
}

#[tokio::test(start_paused = true)]
async fn test_run_until_handles_arrivals() {
    let (mut rig, handle) = mock_rig(Duration::from_secs(5)).await;
    handle.push(MockReply::Deny(None));
    rig.schedule(Duration::from_millis(100), BLOCKED);

    let stats = rig
        .controller
        .run_until(tokio::time::sleep(Duration::from_secs(1)))
        .await;

    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.denials, 1);
    assert_eq!(handle.requests(), 1);
}
