mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::MockDevice;
use epboot::{
    BootClient, ClientState, LoaderImage, Signal, constants::LOADER_WINDOW_SIZE, error::BootError,
};

fn loader(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 + 1).collect()
}

#[test]
fn test_loader_is_padded_to_sram_window() {
    for len in [0, 1, 300, LOADER_WINDOW_SIZE - 1, LOADER_WINDOW_SIZE] {
        let device = MockDevice::with_incoming(b"<>");
        let mut client = device.client();
        let image = loader(len);

        client.enter_boot(&image).unwrap();

        let sent = device.sent();
        assert_eq!(sent.len(), LOADER_WINDOW_SIZE, "loader of {} bytes", len);
        assert_eq!(&sent[..len], image.as_slice());
        assert!(sent[len..].iter().all(|&b| b == 0));
        assert_eq!(client.state(), ClientState::Booted);
    }
}

#[test]
fn test_noise_before_handshake_is_discarded() {
    let device = MockDevice::with_incoming(b"\x00\xffBootROM\r\n<garbage>trailing");
    let mut client = device.client();

    client.enter_boot(&loader(16)).unwrap();

    assert_eq!(device.sent().len(), LOADER_WINDOW_SIZE);
    // Nothing after the acknowledgement is consumed
    assert_eq!(device.pending_input(), b"trailing".to_vec());
    // The BootROM handshake never flushes input
    assert_eq!(device.discards(), 0);
}

#[test]
fn test_nothing_is_sent_before_ready_signal() {
    let device = MockDevice::with_incoming(b"abc");
    let mut client = device.client();
    client.set_timeout(Some(Duration::from_millis(30)));

    let err = client.enter_boot(&loader(16)).unwrap_err();

    assert!(matches!(err, BootError::HandshakeTimeout { expected: '<' }));
    assert!(device.sent().is_empty());
    assert_eq!(client.state(), ClientState::WaitingForHandshake);
}

#[test]
fn test_missing_acknowledgement_times_out() {
    let device = MockDevice::with_incoming(b"<");
    let mut client = device.client();
    client.set_timeout(Some(Duration::from_millis(30)));

    let err = client.enter_boot(&loader(16)).unwrap_err();

    assert!(matches!(err, BootError::HandshakeTimeout { expected: '>' }));
    assert_eq!(device.sent().len(), LOADER_WINDOW_SIZE);
    assert_eq!(client.state(), ClientState::WaitingForAck);
}

#[test]
fn test_oversized_loader_is_rejected_before_waiting() {
    let device = MockDevice::with_incoming(b"<>");
    let mut client = device.client();

    let err = client.enter_boot(&loader(LOADER_WINDOW_SIZE + 1)).unwrap_err();

    assert!(matches!(err, BootError::LoaderError(_)));
    assert!(device.sent().is_empty());
    assert_eq!(device.pending_input(), b"<>".to_vec());
    assert_eq!(client.state(), ClientState::Idle);
}

#[test]
fn test_observer_sees_discarded_bytes() {
    let device = MockDevice::with_incoming(b"x<y>");
    let mut client = device.client();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.set_observer(move |signal, byte| sink.lock().unwrap().push((signal, byte)));

    client.enter_boot(&[]).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Signal::ReadyForImage, b'x'), (Signal::ImageAccepted, b'y')]
    );
}

#[test]
fn test_cancel_aborts_handshake_wait() {
    let device = MockDevice::new();
    let mut client = device.client();
    let token = client.cancel_token();

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        token.cancel();
    });

    let err = client.enter_boot(&loader(8)).unwrap_err();
    canceller.join().unwrap();

    assert!(matches!(err, BootError::Cancelled));
    assert!(!client.cancel_token().is_cancelled());
}

#[test]
fn test_transport_failure_propagates() {
    let device = MockDevice::new();
    device.hang_up();
    let mut client = device.client();

    let err = client.enter_boot(&loader(8)).unwrap_err();
    assert!(matches!(err, BootError::Communication(_)));
}

#[test]
fn test_boot_from_loader_image() {
    let image = LoaderImage::from_bytes(loader(1024)).unwrap();
    let device = MockDevice::with_incoming(b"<>");
    device.queue_reply(b"!");
    let mut client: BootClient = device.client();

    client.enter_boot(image.as_bytes()).unwrap();
    client.ping().unwrap();

    let sent = device.sent();
    assert_eq!(sent.len(), LOADER_WINDOW_SIZE + 1);
    assert_eq!(&sent[..1024], image.as_bytes());
    assert_eq!(sent[LOADER_WINDOW_SIZE], b'a');
}
