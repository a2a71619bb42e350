//! In-memory `Remote` for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use spolist_api::client::{Remote, RemoteError};
use spolist_api::model::{
    Device, NowPlayingSnapshot, PageToken, Playlist, PlaylistPage, TransportCommand,
};

pub struct FakeRemote {
    pub calls: Mutex<Vec<String>>,
    pub playlists: Mutex<Vec<Playlist>>,
    pub devices: Mutex<Result<Vec<Device>, RemoteError>>,
    pub now_playing: Mutex<Result<Option<NowPlayingSnapshot>, RemoteError>>,
    pub transport: Mutex<Result<(), RemoteError>>,
    /// Commands in the order they completed.
    pub sent: Mutex<Vec<TransportCommand>>,
    /// How long a `Play` takes to complete.
    pub play_delay: Mutex<Duration>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            playlists: Mutex::new(Vec::new()),
            devices: Mutex::new(Ok(Vec::new())),
            now_playing: Mutex::new(Ok(None)),
            transport: Mutex::new(Ok(())),
            sent: Mutex::new(Vec::new()),
            play_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<TransportCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

pub fn playlist(id: &str, tracks: u32) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: format!("Playlist {}", id),
        track_count: tracks,
        owner: "someone".to_string(),
        uri: format!("spotify:playlist:{}", id),
    }
}

pub fn device(id: &str) -> Device {
    Device {
        id: id.to_string(),
        name: format!("Device {}", id),
        kind: "Computer".to_string(),
        is_active: false,
        volume_percent: Some(50),
        supports_volume: true,
    }
}

impl Remote for FakeRemote {
    async fn search_playlists(
        &self,
        query: &str,
        _page: Option<PageToken>,
    ) -> Result<PlaylistPage, RemoteError> {
        self.record(format!("search:{}", query));
        Ok(PlaylistPage {
            items: self.playlists.lock().unwrap().clone(),
            next: None,
        })
    }

    async fn list_own_playlists(
        &self,
        _page: Option<PageToken>,
    ) -> Result<PlaylistPage, RemoteError> {
        self.record("own");
        Ok(PlaylistPage {
            items: self.playlists.lock().unwrap().clone(),
            next: None,
        })
    }

    async fn list_devices(&self) -> Result<Vec<Device>, RemoteError> {
        self.record("devices");
        self.devices.lock().unwrap().clone()
    }

    async fn now_playing(&self) -> Result<Option<NowPlayingSnapshot>, RemoteError> {
        self.record("now_playing");
        self.now_playing.lock().unwrap().clone()
    }

    async fn send_transport(
        &self,
        command: &TransportCommand,
        _device_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.record(format!("transport:{}", command.label()));
        if matches!(command, TransportCommand::Play { .. }) {
            let delay = *self.play_delay.lock().unwrap();
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(command.clone());
        self.transport.lock().unwrap().clone()
    }
}
