//! Recursive folder transfer.
//!
//! Outbound: walk the directory in stable order, open the transfer with
//! `FOLDER_START`, announce each file with `FOLDER_FILE` before sending it
//! through the file service, then close with `FOLDER_END`. Inbound: each
//! transfer materializes under a collision-free directory in the download
//! root; the next arriving file whose size matches the announced one lands
//! at the announced relative path.

use std::{
    collections::HashMap,
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use framelink_core::{
    config::Config,
    error::{ErrorKind, Result},
    hwaddr::HardwareAddress,
    sink::EventSink,
};
use framelink_link::transceiver::LinkTransceiver;
use framelink_protocol::{
    control::{FolderControl, FolderEnd, FolderFile, FolderStart},
    frame::FrameType,
};
use rand::Rng;

use crate::{clock::unix_now, files::FileTransferService};

/// An in-progress folder materialization.
#[derive(Debug)]
struct FolderReceive {
    source: HardwareAddress,
    root: PathBuf,
    name: String,
    expected_files: u32,
    files_done: u32,
    /// Relative path and size of the next file, set by `FOLDER_FILE`.
    expecting: Option<(PathBuf, u64)>,
    last_update: Instant,
}

/// Sends and receives directory trees.
pub struct FolderTransferService {
    transceiver: Arc<LinkTransceiver>,
    sink: Arc<dyn EventSink>,
    receives: HashMap<String, FolderReceive>,
    download_dir: PathBuf,
    receive_ttl: Duration,
}

impl FolderTransferService {
    /// Creates the service.
    pub fn new(
        transceiver: Arc<LinkTransceiver>,
        sink: Arc<dyn EventSink>,
        config: &Config,
    ) -> Self {
        Self {
            transceiver,
            sink,
            receives: HashMap::new(),
            download_dir: config.download_dir.clone(),
            receive_ttl: config.folder_receive_ttl,
        }
    }

    /// Walks `folder` and sends its files to `destination`.
    pub fn send_folder(
        &self,
        files: &FileTransferService,
        folder: &Path,
        destination: HardwareAddress,
    ) -> Result<()> {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ErrorKind::MalformedControl("path has no folder name".into()))?;

        let mut entries = Vec::new();
        collect_files(folder, folder, &mut entries)?;
        entries.sort();

        let transfer_id = format!("{:016x}", rand::thread_rng().gen::<u64>());
        self.send_control(
            destination,
            &FolderControl::Start(FolderStart {
                transfer_id: transfer_id.clone(),
                name: name.clone(),
                total_files: entries.len() as u32,
                timestamp: unix_now(),
            }),
        )?;

        for (index, relative) in entries.iter().enumerate() {
            let absolute = folder.join(relative);
            let file_size = fs::metadata(&absolute)?.len();
            let relative_path = path_to_wire(relative);

            self.send_control(
                destination,
                &FolderControl::File(FolderFile {
                    transfer_id: transfer_id.clone(),
                    relative_path: relative_path.clone(),
                    file_size,
                }),
            )?;
            files.send_file_as(&absolute, &relative_path, destination)?;
            self.sink.update_progress(&name, (index + 1) as u64, entries.len() as u64);
        }

        self.send_control(
            destination,
            &FolderControl::End(FolderEnd {
                transfer_id,
                files_sent: entries.len() as u32,
            }),
        )?;
        self.sink
            .display_message("System", &format!("folder {} sent ({} files)", name, entries.len()));
        Ok(())
    }

    /// Handles one inbound folder control message.
    pub fn handle_control(&mut self, source: HardwareAddress, control: FolderControl) {
        self.sweep_expired();
        match control {
            FolderControl::Start(start) => self.handle_start(source, start),
            FolderControl::File(file) => self.handle_file(source, file),
            FolderControl::End(end) => self.handle_end(end),
        }
    }

    /// Claims the expected file for a receive from `source` when `size`
    /// matches, returning the absolute path the content belongs at.
    pub fn claim_expected_file(
        &mut self,
        source: HardwareAddress,
        size: u64,
    ) -> Option<PathBuf> {
        let receive = self
            .receives
            .values_mut()
            .find(|r| r.source == source && matches!(r.expecting, Some((_, s)) if s == size))?;

        let (relative, _) = receive.expecting.take()?;
        receive.files_done += 1;
        receive.last_update = Instant::now();
        self.sink.update_progress(
            &receive.name,
            receive.files_done as u64,
            receive.expected_files as u64,
        );
        Some(receive.root.join(relative))
    }

    /// Number of in-progress receives.
    pub fn receive_count(&self) -> usize {
        self.receives.len()
    }

    fn handle_start(&mut self, source: HardwareAddress, start: FolderStart) {
        let root = unique_dir(&self.download_dir, &start.name);
        if let Err(e) = fs::create_dir_all(&root) {
            self.sink.report_error("folder receive", &e.to_string());
            return;
        }
        self.sink.display_message(
            "System",
            &format!("receiving folder {} ({} files)", start.name, start.total_files),
        );
        self.receives.insert(
            start.transfer_id,
            FolderReceive {
                source,
                root,
                name: start.name,
                expected_files: start.total_files,
                files_done: 0,
                expecting: None,
                last_update: Instant::now(),
            },
        );
    }

    fn handle_file(&mut self, source: HardwareAddress, file: FolderFile) {
        let relative = match sanitize_relative_path(&file.relative_path) {
            Some(relative) => relative,
            None => {
                self.sink.report_error(
                    "folder receive",
                    &format!("rejecting unsafe path {:?}", file.relative_path),
                );
                return;
            }
        };
        match self.receives.get_mut(&file.transfer_id) {
            Some(receive) if receive.source == source => {
                receive.expecting = Some((relative, file.file_size));
                receive.last_update = Instant::now();
            }
            _ => {
                tracing::warn!(
                    "FOLDER_FILE for unknown transfer {} from {}",
                    file.transfer_id,
                    source
                );
            }
        }
    }

    fn handle_end(&mut self, end: FolderEnd) {
        let receive = match self.receives.remove(&end.transfer_id) {
            Some(receive) => receive,
            None => {
                tracing::warn!("FOLDER_END for unknown transfer {}", end.transfer_id);
                return;
            }
        };
        if receive.files_done != end.files_sent {
            self.sink.report_error(
                "folder receive",
                &format!(
                    "folder {} incomplete: {} of {} files arrived",
                    receive.name, receive.files_done, end.files_sent
                ),
            );
        } else {
            self.sink.display_message(
                "System",
                &format!(
                    "folder {} received ({} files) in {}",
                    receive.name,
                    receive.files_done,
                    receive.root.display()
                ),
            );
        }
    }

    fn send_control(&self, destination: HardwareAddress, control: &FolderControl) -> Result<()> {
        let wire = control.to_wire()?;
        self.transceiver.send_message(destination, FrameType::Text, wire.into_bytes(), false)
    }

    fn sweep_expired(&mut self) {
        let ttl = self.receive_ttl;
        self.receives.retain(|transfer_id, receive| {
            let expired = receive.last_update.elapsed() > ttl;
            if expired {
                tracing::warn!(
                    "folder receive {} ({}) expired after {}/{} files",
                    transfer_id,
                    receive.name,
                    receive.files_done,
                    receive.expected_files
                );
            }
            !expired
        });
    }
}

/// Recursively collects file paths relative to `base`, entries visited in
/// name order so the walk is stable across hosts.
fn collect_files(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Renders a relative path with forward slashes for the wire.
fn path_to_wire(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Accepts only plain relative paths: no roots, no `..`, no empties.
fn sanitize_relative_path(wire: &str) -> Option<PathBuf> {
    if wire.is_empty() {
        return None;
    }
    let path: PathBuf = wire.split('/').collect();
    let safe = path.components().all(|c| matches!(c, Component::Normal(_)));
    safe.then_some(path)
}

/// Appends `_1`, `_2`, ... until the directory name is free.
fn unique_dir(parent: &Path, name: &str) -> PathBuf {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}", name, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
