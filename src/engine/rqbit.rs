//! librqbit-backed transfer engine
//!
//! `Session::add_torrent` resolves magnet metadata before it returns, which can
//! take arbitrarily long. `acquire` therefore hands the add to a background
//! task and returns immediately; the handle reports metadata readiness once
//! that task has produced a torrent handle.

use super::{EngineHandle, TransferEngine, TransferStatus, validate_magnet};
use crate::error::EngineError;
use async_trait::async_trait;
use librqbit::api::TorrentIdOrHash;
use librqbit::{
    AddTorrent, AddTorrentOptions, AddTorrentResponse, ManagedTorrent, Session,
    TorrentStatsState,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Mirrors librqbit's `ManagedTorrentHandle`, which is not re-exported at the crate root.
type ManagedTorrentHandle = Arc<ManagedTorrent>;

/// Transfer engine backed by a single librqbit [`Session`]
pub struct RqbitEngine {
    session: Arc<Session>,
}

impl RqbitEngine {
    /// Open a session whose default output folder is `download_dir`
    pub async fn new(download_dir: PathBuf) -> Result<Self, EngineError> {
        tokio::fs::create_dir_all(&download_dir)
            .await
            .map_err(|e| EngineError::Init(format!("create {}: {e}", download_dir.display())))?;

        let session = Session::new(download_dir.clone())
            .await
            .map_err(|e| EngineError::Init(format!("create bt session: {e:#}")))?;

        tracing::info!(download_dir = %download_dir.display(), "librqbit session started");
        Ok(Self { session })
    }

    /// Number of torrents the session currently manages
    pub fn managed_count(&self) -> usize {
        self.session.with_torrents(|torrents| torrents.count())
    }
}

/// Take ownership of a freshly added torrent
///
/// A torrent the session already manages belongs to another job, so it is
/// refused rather than shared.
fn claim_added(response: AddTorrentResponse) -> Result<ManagedTorrentHandle, String> {
    match response {
        AddTorrentResponse::Added(_, handle) => Ok(handle),
        AddTorrentResponse::AlreadyManaged(id, _) => Err(format!(
            "already being transferred by another job (torrent {id})"
        )),
        AddTorrentResponse::ListOnly(_) => Err("engine returned no torrent handle".to_string()),
    }
}

#[async_trait]
impl TransferEngine for RqbitEngine {
    fn name(&self) -> &'static str {
        "rqbit"
    }

    async fn acquire(
        &self,
        identifier: &str,
        save_path: &Path,
    ) -> Result<Box<dyn EngineHandle>, EngineError> {
        validate_magnet(identifier)?;

        let torrent: Arc<OnceLock<ManagedTorrentHandle>> = Arc::new(OnceLock::new());
        let failure: Arc<OnceLock<String>> = Arc::new(OnceLock::new());

        let options = AddTorrentOptions {
            output_folder: Some(save_path.to_string_lossy().to_string()),
            overwrite: true,
            ..Default::default()
        };

        let add_task = {
            let session = self.session.clone();
            let torrent = torrent.clone();
            let failure = failure.clone();
            let identifier = identifier.to_string();
            tokio::spawn(async move {
                let added = session
                    .add_torrent(AddTorrent::from_url(identifier.as_str()), Some(options))
                    .await;
                match added.map_err(|e| format!("{e:#}")).and_then(claim_added) {
                    Ok(handle) => {
                        tracing::debug!(identifier = %identifier, torrent_id = handle.id() as u64, "Torrent metadata resolved");
                        let _ = torrent.set(handle);
                    }
                    Err(reason) => {
                        tracing::warn!(identifier = %identifier, reason = %reason, "Failed to add torrent");
                        let _ = failure.set(reason);
                    }
                }
            })
        };

        Ok(Box::new(RqbitHandle {
            session: self.session.clone(),
            torrent,
            failure,
            add_task: Some(add_task),
        }))
    }

    async fn shutdown(&self) {
        self.session.stop().await;
        tracing::info!("librqbit session stopped");
    }
}

struct RqbitHandle {
    session: Arc<Session>,
    torrent: Arc<OnceLock<ManagedTorrentHandle>>,
    failure: Arc<OnceLock<String>>,
    add_task: Option<JoinHandle<()>>,
}

impl RqbitHandle {
    fn torrent(&self) -> Option<&ManagedTorrentHandle> {
        self.torrent.get()
    }
}

#[async_trait]
impl EngineHandle for RqbitHandle {
    fn has_metadata(&self) -> bool {
        self.torrent().is_some()
    }

    fn status(&self) -> TransferStatus {
        let Some(torrent) = self.torrent() else {
            return TransferStatus::default();
        };
        let stats = torrent.stats();

        let progress_ratio = if stats.total_bytes == 0 {
            0.0
        } else {
            stats.progress_bytes as f64 / stats.total_bytes as f64
        };
        let (download_rate, peer_count) = match &stats.live {
            Some(live) => (
                (live.download_speed.mbps * 1024.0 * 1024.0) as u64,
                live.snapshot.peer_stats.live,
            ),
            None => (0, 0),
        };

        TransferStatus {
            progress_ratio,
            download_rate,
            peer_count,
            is_paused: matches!(stats.state, TorrentStatsState::Paused),
            is_complete: stats.finished,
        }
    }

    fn failure(&self) -> Option<String> {
        if let Some(reason) = self.failure.get() {
            return Some(reason.clone());
        }
        self.torrent().and_then(|t| t.stats().error)
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        let Some(torrent) = self.torrent.get() else {
            return Err(EngineError::Pause("metadata not resolved yet".to_string()));
        };
        self.session
            .pause(torrent)
            .await
            .map_err(|e| EngineError::Pause(format!("{e:#}")))
    }

    async fn resume(&mut self) -> Result<(), EngineError> {
        let Some(torrent) = self.torrent.get() else {
            return Err(EngineError::Resume("metadata not resolved yet".to_string()));
        };
        self.session
            .unpause(torrent)
            .await
            .map_err(|e| EngineError::Resume(format!("{e:#}")))
    }

    async fn release(mut self: Box<Self>) -> Result<(), EngineError> {
        // Stop a metadata lookup that never finished, and wait for it so a
        // late add cannot slip in after the check below
        if let Some(task) = self.add_task.take() {
            if !task.is_finished() {
                task.abort();
            }
            let _ = task.await;
        }

        let Some(torrent) = self.torrent.get() else {
            return Ok(());
        };
        let id = TorrentIdOrHash::Id(torrent.id());
        self.session
            .delete(id, false)
            .await
            .map_err(|e| EngineError::Release(format!("{e:#}")))
    }
}
