//! Scripted device doubles.
//!
//! [`MockConnection`] answers admin-app commands from a per-command queue of
//! scripted replies. Commands without a scripted reply fail with
//! `INVALID_COMMAND`, which is what firmware does for commands it does not
//! know. Clones share their state, so a test can keep a clone for
//! inspection after handing the original to the code under test.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use nitrokey_device::connection::check_response_len;
use nitrokey_device::{App, Bootloader, Connection, Model, Uuid, VID_NITROKEY, Variant};
use nitrokey_errors::{CtapCode, DeviceError, DeviceResult};
use parking_lot::Mutex;

/// A request seen by a [`MockConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Command byte (legacy command or admin-app command prefix)
    pub command: u8,
    /// Application the request was routed to, `None` for legacy commands
    pub app: Option<App>,
    /// Request payload without the command byte
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct ConnectionState {
    replies: HashMap<u8, VecDeque<DeviceResult<Vec<u8>>>>,
    calls: Vec<RecordedCall>,
    close_count: usize,
    wink_count: usize,
}

/// A [`Connection`] answering from scripted replies.
#[derive(Debug, Clone)]
pub struct MockConnection {
    path: Option<String>,
    vid_pid: Option<(u16, u16)>,
    state: Arc<Mutex<ConnectionState>>,
}

impl MockConnection {
    /// A Nitrokey 3 connection with no scripted replies.
    pub fn new() -> Self {
        Self::for_model(Model::Nk3)
    }

    /// A connection reporting the VID:PID of `model`.
    pub fn for_model(model: Model) -> Self {
        Self {
            path: Some(format!("/dev/mock-{}", model.short_id())),
            vid_pid: Some((VID_NITROKEY, model.device_pid())),
            state: Arc::default(),
        }
    }

    /// Override the reported VID:PID.
    pub fn with_vid_pid(mut self, vid_pid: Option<(u16, u16)>) -> Self {
        self.vid_pid = vid_pid;
        self
    }

    /// Queue a successful reply for a command byte.
    pub fn respond(&self, command: u8, reply: impl Into<Vec<u8>>) -> &Self {
        self.push(command, Ok(reply.into()))
    }

    /// Queue a failure for a command byte.
    pub fn fail(&self, command: u8, error: DeviceError) -> &Self {
        self.push(command, Err(error))
    }

    fn push(&self, command: u8, reply: DeviceResult<Vec<u8>>) -> &Self {
        self.state
            .lock()
            .replies
            .entry(command)
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request seen so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Command bytes of every request seen so far.
    pub fn commands(&self) -> Vec<u8> {
        self.state.lock().calls.iter().map(|call| call.command).collect()
    }

    /// How often `close` was called.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// How often `wink` was called.
    pub fn wink_count(&self) -> usize {
        self.state.lock().wink_count
    }

    /// Box the connection for [`nitrokey_device::TrussedDevice::new`].
    pub fn boxed(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }

    fn answer(
        &self,
        command: u8,
        app: Option<App>,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            command,
            app,
            data: data.to_vec(),
        });
        let name = format!("{command:#04x}");
        let reply = state
            .replies
            .get_mut(&command)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(DeviceError::ctap(name.clone(), CtapCode::INVALID_COMMAND)))?;
        check_response_len(&name, &reply, response_len)?;
        Ok(reply)
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MockConnection {
    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn vid_pid(&self) -> Option<(u16, u16)> {
        self.vid_pid
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.state.lock().close_count += 1;
        Ok(())
    }

    fn wink(&mut self) -> DeviceResult<()> {
        self.state.lock().wink_count += 1;
        Ok(())
    }

    fn call_admin_app_legacy(
        &mut self,
        command: u8,
        _name: &str,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>> {
        self.answer(command, None, data, response_len)
    }

    fn call_app(
        &mut self,
        app: App,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>> {
        let (command, payload) = data
            .split_first()
            .map(|(command, payload)| (*command, payload))
            .unwrap_or((0, &[]));
        self.answer(command, Some(app), payload, response_len)
    }
}

#[derive(Debug, Default)]
struct BootloaderState {
    flashed: Vec<Vec<u8>>,
    close_count: usize,
    update_error: Option<DeviceError>,
}

/// A [`Bootloader`] that records flashed images.
#[derive(Debug, Clone)]
pub struct MockBootloader {
    model: Model,
    variant: Variant,
    uuid: Option<Uuid>,
    state: Arc<Mutex<BootloaderState>>,
}

impl MockBootloader {
    /// A bootloader for `model` running on `variant`.
    pub fn new(model: Model, variant: Variant) -> Self {
        Self {
            model,
            variant,
            uuid: Some(Uuid::from(0x1234_5678_u128)),
            state: Arc::default(),
        }
    }

    /// Override the reported UUID.
    pub fn with_uuid(mut self, uuid: Option<Uuid>) -> Self {
        self.uuid = uuid;
        self
    }

    /// Make the next `update` call fail.
    pub fn fail_update(&self, error: DeviceError) {
        self.state.lock().update_error = Some(error);
    }

    /// Images passed to `update` so far.
    pub fn flashed(&self) -> Vec<Vec<u8>> {
        self.state.lock().flashed.clone()
    }

    /// How often `close` was called.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Box the bootloader for a device handle.
    pub fn boxed(&self) -> Box<dyn Bootloader> {
        Box::new(self.clone())
    }
}

impl Bootloader for MockBootloader {
    fn model(&self) -> Model {
        self.model
    }

    fn variant(&self) -> Variant {
        self.variant
    }

    fn path(&self) -> Option<&str> {
        Some("/dev/mock-bootloader")
    }

    fn uuid(&mut self) -> DeviceResult<Option<Uuid>> {
        Ok(self.uuid)
    }

    fn update(&mut self, image: &[u8], progress: &mut dyn FnMut(u64, u64)) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if let Some(error) = state.update_error.take() {
            return Err(error);
        }
        let total = image.len() as u64;
        for written in (0..=total).step_by(4096) {
            progress(written, total);
        }
        progress(total, total);
        state.flashed.push(image.to_vec());
        Ok(())
    }

    fn reboot(&mut self) -> DeviceResult<bool> {
        Ok(true)
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.state.lock().close_count += 1;
        Ok(())
    }
}
