use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use epboot::{
    BootClient,
    error::{BootError, BootResult},
    interface::DeviceInterface,
};

#[derive(Default)]
struct Link {
    /// Bytes already sitting in the host's receive buffer
    incoming: VecDeque<u8>,
    /// Device answers, each released into `incoming` by the input flush that
    /// precedes the command it answers
    replies: VecDeque<Vec<u8>>,
    sent: Vec<u8>,
    discards: usize,
    hung_up: bool,
}

/// Scripted stand-in for the serial line
#[derive(Clone, Default)]
pub struct MockDevice {
    link: Arc<Mutex<Link>>,
}

#[allow(dead_code)]
impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_incoming(bytes: &[u8]) -> Self {
        let device = Self::default();
        device.link.lock().unwrap().incoming.extend(bytes);
        device
    }

    pub fn queue_reply(&self, bytes: &[u8]) {
        self.link.lock().unwrap().replies.push_back(bytes.to_vec());
    }

    pub fn hang_up(&self) {
        self.link.lock().unwrap().hung_up = true;
    }

    pub fn sent(&self) -> Vec<u8> {
        self.link.lock().unwrap().sent.clone()
    }

    pub fn discards(&self) -> usize {
        self.link.lock().unwrap().discards
    }

    pub fn pending_input(&self) -> Vec<u8> {
        self.link.lock().unwrap().incoming.iter().copied().collect()
    }

    pub fn client(&self) -> BootClient {
        BootClient::with_device(Box::new(self.clone()))
    }
}

impl DeviceInterface for MockDevice {
    fn send(&mut self, bytes: &[u8]) -> BootResult<()> {
        let mut link = self.link.lock().unwrap();
        if link.hung_up {
            return Err(BootError::Communication("Broken pipe".to_string()));
        }
        link.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> BootResult<usize> {
        let mut link = self.link.lock().unwrap();
        if link.incoming.is_empty() && link.hung_up {
            return Err(BootError::Communication("Device disconnected".to_string()));
        }

        let mut size = 0;
        while size < buffer.len() {
            match link.incoming.pop_front() {
                Some(byte) => {
                    buffer[size] = byte;
                    size += 1;
                }
                None => break,
            }
        }
        Ok(size)
    }

    fn discard_input(&mut self) -> BootResult<()> {
        let mut link = self.link.lock().unwrap();
        link.discards += 1;
        link.incoming.clear();
        if let Some(reply) = link.replies.pop_front() {
            link.incoming.extend(reply);
        }
        Ok(())
    }
}
