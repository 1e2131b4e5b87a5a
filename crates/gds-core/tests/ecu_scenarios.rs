//! Client scenarios against the simulated ECU
//!
//! Every test runs on paused tokio time, so response and flow-control
//! timeouts elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use gds_core::bus::mock::MockBus;
use gds_core::config::{GdsConfig, MockConfig, ModuleConfig};
use gds_core::kwp::io_control_type;
use gds_core::{
    DiagnosticOutcome, Frame, GdsClient, NoKeyDerivation, NrcCode, SessionKind, TransferDirection,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio::time::Instant;

fn setup_with(config: MockConfig) -> (Arc<MockBus>, GdsClient) {
    let bus = Arc::new(MockBus::new(&config));
    let mut client = GdsClient::new(bus.clone(), &GdsConfig::default()).unwrap();
    client.select_module("PCM").unwrap();
    (bus, client)
}

fn setup() -> (Arc<MockBus>, GdsClient) {
    setup_with(MockConfig::default())
}

fn sent_data(bus: &MockBus) -> Vec<Vec<u8>> {
    bus.sent_frames()
        .iter()
        .map(|f| f.data().to_vec())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_session_start() {
    let (bus, mut client) = setup();

    let outcome = client.start_session(SessionKind::Diagnostic).await.unwrap();

    assert_eq!(outcome, DiagnosticOutcome::Success(vec![]));
    assert_eq!(sent_data(&bus), vec![vec![0x02, 0x10, 0x81, 0, 0, 0, 0, 0]]);
    assert_eq!(bus.sent_frames()[0].id(), 0x7E0);
    assert_eq!(client.session().active, Some(SessionKind::Diagnostic));
}

#[tokio::test(start_paused = true)]
async fn test_negative_response() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x10, 0x85], &[0x7F, 0x10, 0x22]);

    let outcome = client.start_session(SessionKind::Programming).await.unwrap();

    assert_eq!(
        outcome,
        DiagnosticOutcome::NegativeResponse(NrcCode::ConditionsNotCorrect)
    );
    assert_eq!(client.session().active, None);
}

#[tokio::test(start_paused = true)]
async fn test_unmapped_nrc_is_other() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x22, 0x12, 0x34], &[0x7F, 0x22, 0x99]);

    let outcome = client.read_data_by_identifier(0x1234).await.unwrap();
    assert_eq!(outcome, DiagnosticOutcome::NegativeResponse(NrcCode::Other(0x99)));
}

#[tokio::test(start_paused = true)]
async fn test_did_read() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x22, 0x02, 0x00], &[0x62, 0x02, 0x00, 0xAA, 0xBB]);

    let outcome = client.read_data_by_identifier(0x0200).await.unwrap();

    assert_eq!(outcome, DiagnosticOutcome::Success(vec![0xAA, 0xBB]));
    assert_eq!(sent_data(&bus), vec![vec![0x03, 0x22, 0x02, 0x00, 0, 0, 0, 0]]);
}

#[tokio::test(start_paused = true)]
async fn test_tester_present_suppressed_does_not_wait() {
    let (bus, mut client) = setup();
    let start = Instant::now();

    let outcome = client.tester_present(false).await.unwrap();

    assert_eq!(outcome, DiagnosticOutcome::Success(vec![]));
    assert_eq!(bus.recv_calls(), 0);
    assert_eq!(Instant::now(), start);
    assert_eq!(sent_data(&bus), vec![vec![0x02, 0x3E, 0x02, 0, 0, 0, 0, 0]]);
}

#[tokio::test(start_paused = true)]
async fn test_tester_present_with_response() {
    let (_bus, mut client) = setup();
    assert!(client.tester_present(true).await.unwrap().is_success());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_memory_read_sends_nothing() {
    let (bus, mut client) = setup();

    let outcome = client.read_memory_by_address(0x1000, 0x5000).await.unwrap();

    assert_eq!(
        outcome,
        DiagnosticOutcome::NegativeResponse(NrcCode::RequestOutOfRange)
    );
    assert!(bus.sent_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_oversized_writes_send_nothing() {
    let (bus, mut client) = setup();

    let did = client
        .write_data_by_identifier(0x1234, &[1, 2, 3, 4, 5])
        .await
        .unwrap();
    let local = client
        .write_data_by_local_identifier(0x10, &[0; 6])
        .await
        .unwrap();
    let memory = client.write_memory_by_address(0, &[]).await.unwrap();

    for outcome in [did, local, memory] {
        assert_eq!(
            outcome,
            DiagnosticOutcome::NegativeResponse(NrcCode::RequestOutOfRange)
        );
    }
    assert!(bus.sent_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_response_times_out() {
    let (_bus, mut client) = setup();
    let start = Instant::now();

    let outcome = client.read_data_by_local_identifier(0x42).await.unwrap();

    assert_eq!(outcome, DiagnosticOutcome::NoResponse);
    assert!(Instant::now() - start >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_echo_mismatch_is_unexpected() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x21, 0x05], &[0x61, 0x06, 0x01]);

    let outcome = client.read_data_by_local_identifier(0x05).await.unwrap();
    assert_eq!(outcome, DiagnosticOutcome::UnexpectedResponse);
}

#[tokio::test(start_paused = true)]
async fn test_local_read_output() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x21, 0x05], &[0x61, 0x05, 0x01, 0x02, 0x03]);

    let outcome = client.read_data_by_local_identifier(0x05).await.unwrap();
    assert_eq!(outcome, DiagnosticOutcome::Success(vec![0x01, 0x02, 0x03]));
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_traffic_is_skipped() {
    let (bus, mut client) = setup();
    bus.inject(Frame::padded(0x6F6, &[0x01, 0x02, 0x03], 0).unwrap());
    bus.inject(Frame::padded(0x72E, &[0x02, 0x50, 0x81], 0).unwrap());

    let outcome = client.start_session(SessionKind::Diagnostic).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_multi_frame_response() {
    let (bus, mut client) = setup();

    let outcome = client.read_data_by_identifier(0xF190).await.unwrap();

    assert_eq!(
        outcome,
        DiagnosticOutcome::Success(b"1FMCU0GD5HUA12345".to_vec())
    );
    // Request, then our flow control after the ECU's first frame
    assert_eq!(
        sent_data(&bus)[1],
        vec![0x30, 0x00, 0x00, 0, 0, 0, 0, 0]
    );
}

#[rstest]
#[case(1, 0, 0x00)]
#[case(20, 0, 0x00)]
#[case(100, 2, 0x05)]
#[case(250, 7, 0xF5)]
#[case(4088, 16, 0xF1)]
#[case(4088, 0, 0x7F)]
#[tokio::test(start_paused = true)]
async fn test_multi_frame_request(
    #[case] data_len: usize,
    #[case] block_size: u8,
    #[case] st_min: u8,
) {
    let (bus, mut client) = setup_with(MockConfig {
        block_size,
        st_min,
        latency_ms: 0,
    });
    let address = 0x0012_3400;
    bus.add_response(
        &[0x3D, 0x00, 0x12, 0x34, 0x00],
        &[0x7D, 0x00, 0x12, 0x34, 0x00],
    );

    let data: Vec<u8> = (0..data_len).map(|i| (i % 251) as u8).collect();
    let outcome = client.write_memory_by_address(address, &data).await.unwrap();
    assert_eq!(outcome, DiagnosticOutcome::Success(vec![]));

    let payload_len = 1 + 4 + 2 + data_len;
    let frames = sent_data(&bus);
    let consecutive: Vec<&Vec<u8>> = frames.iter().filter(|f| f[0] >> 4 == 0x2).collect();
    assert_eq!(consecutive.len(), (payload_len - 6).div_ceil(7));

    // Sequence numbers run 1..=15, 0, 1, ...
    for (index, frame) in consecutive.iter().enumerate() {
        assert_eq!(frame[0] & 0x0F, ((index + 1) % 16) as u8);
    }

    // Reassemble what went out and compare with the request
    let first = &frames[0];
    assert_eq!(first[0] >> 4, 0x1);
    assert_eq!(
        ((first[0] as usize & 0x0F) << 8) | first[1] as usize,
        payload_len
    );
    let mut rebuilt = first[2..].to_vec();
    for frame in &consecutive {
        rebuilt.extend_from_slice(&frame[1..]);
    }
    rebuilt.truncate(payload_len);
    let mut expected = vec![0x3D, 0x00, 0x12, 0x34, 0x00];
    expected.extend_from_slice(&(data_len as u16).to_be_bytes());
    expected.extend_from_slice(&data);
    assert_eq!(rebuilt, expected);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_error_does_not_poison_next_call() {
    let (bus, mut client) = setup();
    bus.inject(Frame::padded(0x7E8, &[0x10, 0x10, 1, 2, 3, 4, 5, 6], 0).unwrap());
    bus.inject(Frame::padded(0x7E8, &[0x23, 7, 8, 9, 10, 11, 12, 13], 0).unwrap());

    assert_eq!(client.receive_raw(None).await.unwrap(), None);

    let outcome = client.start_session(SessionKind::Adjustment).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_ecu_reset_waits_and_clears_session() {
    let (_bus, mut client) = setup();
    client.start_session(SessionKind::Programming).await.unwrap();

    let start = Instant::now();
    let outcome = client.ecu_reset().await.unwrap();

    assert!(outcome.is_success());
    assert!(Instant::now() - start >= Duration::from_millis(750));
    assert_eq!(client.session().active, None);
}

#[tokio::test(start_paused = true)]
async fn test_clear_and_read_dtcs() {
    let (_bus, mut client) = setup();

    assert_eq!(
        client.clear_dtc().await.unwrap(),
        DiagnosticOutcome::Success(vec![])
    );
    assert_eq!(
        client.read_dtc_by_status(0x00, 0xFF00).await.unwrap(),
        DiagnosticOutcome::Success(vec![0x01, 0x01, 0x23, 0xE0])
    );
}

#[tokio::test(start_paused = true)]
async fn test_io_control_inputs() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x2F, 0x4A, 0x10], &[0x6F, 0x4A, 0x10, 0x07, 0x01, 0x02]);

    let outcome = client
        .io_control_by_identifier(0x4A10, io_control_type::SHORT_TERM_ADJUSTMENT, 0x0102u32)
        .await
        .unwrap();
    assert_eq!(outcome, DiagnosticOutcome::Success(vec![0x07, 0x01, 0x02]));
    assert_eq!(
        sent_data(&bus)[0],
        vec![0x06, 0x2F, 0x4A, 0x10, 0x07, 0x01, 0x02, 0x00]
    );

    let negative = client
        .io_control_by_identifier(0x4A10, 0x07, -1i64)
        .await
        .unwrap();
    assert_eq!(negative, DiagnosticOutcome::InvalidArgument);

    let too_big = client
        .io_control_by_identifier(0x4A10, 0x07, 0x0100_0000u32)
        .await
        .unwrap();
    assert_eq!(
        too_big,
        DiagnosticOutcome::NegativeResponse(NrcCode::RequestOutOfRange)
    );

    let too_long = client
        .io_control_by_identifier(0x4A10, 0x07, vec![1u8, 2, 3, 4])
        .await
        .unwrap();
    assert_eq!(
        too_long,
        DiagnosticOutcome::NegativeResponse(NrcCode::RequestOutOfRange)
    );

    let garbage = client
        .io_control_by_identifier(0x4A10, 0x07, "on")
        .await
        .unwrap();
    assert_eq!(garbage, DiagnosticOutcome::InvalidArgument);

    assert_eq!(bus.sent_frames().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_security_zero_seed_is_unlocked() {
    let (bus, mut client) = setup();

    let outcome = client.unlock(&NoKeyDerivation).await.unwrap();

    assert!(outcome.is_success());
    assert!(client.session().security_unlocked);
    // Seed request only, no key
    assert_eq!(bus.sent_frames().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_security_handshake() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x27, 0x01], &[0x67, 0x01, 0x12, 0x34]);
    bus.add_response(&[0x27, 0x02, 0xED, 0xCB], &[0x67, 0x02]);

    let invert = |seed: &[u8]| Some(seed.iter().map(|b| !b).collect::<Vec<u8>>());
    let outcome = client.unlock(&invert).await.unwrap();

    assert_eq!(outcome, DiagnosticOutcome::Success(vec![]));
    assert!(client.session().security_unlocked);
    assert_eq!(
        sent_data(&bus)[1],
        vec![0x04, 0x27, 0x02, 0xED, 0xCB, 0, 0, 0]
    );
}

#[tokio::test(start_paused = true)]
async fn test_security_without_algorithm() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x27, 0x01], &[0x67, 0x01, 0x12, 0x34]);

    let outcome = client.unlock(&NoKeyDerivation).await.unwrap();
    assert_eq!(outcome, DiagnosticOutcome::NotYetImplemented);
    assert!(!client.session().security_unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_security_wrong_key() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x27, 0x02], &[0x7F, 0x27, 0x35]);

    assert_eq!(
        client.send_key(&[0x00, 0x01]).await.unwrap(),
        DiagnosticOutcome::NegativeResponse(NrcCode::InvalidKey)
    );
    assert!(!client.session().security_unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_seed_output() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x27, 0x01], &[0x67, 0x01, 0xAB, 0xCD, 0xEF]);

    assert_eq!(
        client.request_seed().await.unwrap(),
        DiagnosticOutcome::Success(vec![0xAB, 0xCD, 0xEF])
    );
}

#[tokio::test(start_paused = true)]
async fn test_download_transfer_lifecycle() {
    let (bus, mut client) = setup();
    bus.add_response(&[0x34], &[0x74, 0x20, 0x00, 0x80]);
    bus.add_response(&[0x36, 0x01], &[0x76, 0x01]);
    bus.add_response(&[0x36, 0x02], &[0x76, 0x02]);
    bus.add_response(&[0x37], &[0x77]);

    let outcome = client.request_download(0x0001_0000, 0x0200).await.unwrap();
    assert_eq!(outcome, DiagnosticOutcome::Success(vec![0x20, 0x00, 0x80]));
    assert_eq!(
        sent_data(&bus)[0],
        vec![0x10, 0x09, 0x34, 0x00, 0x01, 0x00, 0x00, 0x00]
    );

    let transfer = client.session().transfer.clone().unwrap();
    assert_eq!(transfer.direction, TransferDirection::Download);
    assert_eq!(transfer.address, 0x0001_0000);
    assert_eq!(transfer.size, 0x0200);
    assert_eq!(transfer.block_number, 1);

    assert!(client.transfer_next().await.unwrap().is_success());
    assert!(client.transfer_next().await.unwrap().is_success());
    assert_eq!(client.session().transfer.as_ref().unwrap().block_number, 3);

    assert!(client.request_transfer_exit().await.unwrap().is_success());
    assert_eq!(client.session().transfer, None);
    assert_eq!(
        client.transfer_next().await.unwrap(),
        DiagnosticOutcome::InvalidArgument
    );
}

#[tokio::test(start_paused = true)]
async fn test_upload_returns_block_data() {
    let (bus, mut client) = setup();
    let block: Vec<u8> = (0..=255u8).collect();
    let mut response = vec![0x76, 0x01];
    response.extend_from_slice(&block);
    bus.add_response(&[0x35], &[0x75, 0x01, 0x00]);
    bus.add_response(&[0x36, 0x01], &response);

    assert!(client.request_upload(0x8000, 0x100).await.unwrap().is_success());
    assert_eq!(
        client.transfer_next().await.unwrap(),
        DiagnosticOutcome::Success(block)
    );

    let aborted = client.abort_transfer().unwrap();
    assert_eq!(aborted.direction, TransferDirection::Upload);
    assert_eq!(aborted.block_number, 2);
    assert_eq!(client.session().transfer, None);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_request_bounds() {
    let (bus, mut client) = setup();
    assert_eq!(
        client.request_download(0, 0).await.unwrap(),
        DiagnosticOutcome::NegativeResponse(NrcCode::RequestOutOfRange)
    );
    assert_eq!(
        client.request_upload(0, 0x0100_0000).await.unwrap(),
        DiagnosticOutcome::NegativeResponse(NrcCode::RequestOutOfRange)
    );
    assert!(bus.sent_frames().is_empty());
    assert_eq!(client.session().transfer, None);
}

#[tokio::test(start_paused = true)]
async fn test_configured_module_table() {
    let bus = Arc::new(MockBus::new(&MockConfig::default()));
    bus.add_module(0x7E1, 0x7E9);

    let mut config = GdsConfig::default();
    config.modules.push(ModuleConfig {
        name: "TCM".to_string(),
        request_id: "0x7E1".to_string(),
        response_id: "0x7E9".to_string(),
    });

    let mut client = GdsClient::new(bus.clone(), &config).unwrap();
    assert!(client.select_module("PCM").is_err());
    client.select_module("TCM").unwrap();

    assert!(client
        .start_session(SessionKind::Diagnostic)
        .await
        .unwrap()
        .is_success());
    assert_eq!(bus.sent_frames()[0].id(), 0x7E1);
}
