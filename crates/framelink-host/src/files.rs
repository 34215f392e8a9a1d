//! File transfer over `File`-typed messages.
//!
//! Outbound: the file's bytes are wrapped in a `FILE_TRANSFER` envelope and
//! submitted as one logical message; the fragmenting codec handles size.
//! Inbound: the envelope is parsed and validated, and the content lands in
//! the download directory under a collision-free name, unless a folder
//! receive is waiting for a file of that size.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use framelink_core::{
    config::Config,
    error::{ErrorKind, Result},
    hwaddr::HardwareAddress,
    sink::EventSink,
};
use framelink_link::transceiver::LinkTransceiver;
use framelink_protocol::{envelope, frame::FrameType};

use crate::folders::FolderTransferService;

/// Sends and receives single files.
pub struct FileTransferService {
    transceiver: Arc<LinkTransceiver>,
    sink: Arc<dyn EventSink>,
    download_dir: PathBuf,
}

impl FileTransferService {
    /// Creates the service.
    pub fn new(
        transceiver: Arc<LinkTransceiver>,
        sink: Arc<dyn EventSink>,
        config: &Config,
    ) -> Self {
        Self { transceiver, sink, download_dir: config.download_dir.clone() }
    }

    /// Reads a file and sends it to `destination` as one logical message.
    pub fn send_file(&self, path: &Path, destination: HardwareAddress) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ErrorKind::MalformedControl("path has no file name".into()))?;
        self.send_file_as(path, &name, destination)
    }

    /// Like `send_file`, but announces `name` (used by folder transfer to
    /// announce relative paths).
    pub fn send_file_as(
        &self,
        path: &Path,
        name: &str,
        destination: HardwareAddress,
    ) -> Result<()> {
        let content = fs::read(path)?;
        let size = content.len() as u64;
        let payload = envelope::build(name, &content);

        self.transceiver.send_message(destination, FrameType::File, payload, true)?;
        self.sink.update_progress(name, size, size);
        Ok(())
    }

    /// Handles one reassembled `File` payload.
    ///
    /// Parse and size failures are surfaced to the user sink; nothing is
    /// written in that case. Payloads without the envelope prefix are
    /// saved raw under a timestamped name.
    pub fn handle_payload(
        &self,
        source: HardwareAddress,
        payload: &[u8],
        folders: &mut FolderTransferService,
    ) {
        match envelope::parse(payload) {
            Ok(Some(file)) => {
                if let Some(target) = folders.claim_expected_file(source, file.content.len() as u64)
                {
                    self.write_folder_file(&target, file.content);
                } else {
                    self.save_to_downloads(file.name, file.content);
                }
            }
            Ok(None) => {
                let name = format!("received_{}.bin", unix_millis());
                self.save_to_downloads(&name, payload);
            }
            Err(e) => {
                self.sink.report_error("file receive", &e.to_string());
            }
        }
    }

    fn save_to_downloads(&self, name: &str, content: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.download_dir) {
            self.sink.report_error("file receive", &e.to_string());
            return;
        }
        let target = unique_path(&self.download_dir, name);
        match fs::write(&target, content) {
            Ok(()) => {
                self.sink.display_message(
                    "System",
                    &format!("received file {} ({} bytes)", target.display(), content.len()),
                );
            }
            Err(e) => self.sink.report_error("file receive", &e.to_string()),
        }
    }

    fn write_folder_file(&self, target: &Path, content: &[u8]) {
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                self.sink.report_error("folder receive", &e.to_string());
                return;
            }
        }
        if let Err(e) = fs::write(target, content) {
            self.sink.report_error("folder receive", &e.to_string());
        }
    }
}

/// Appends `_1`, `_2`, ... before the extension until the name is free.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = Path::new(name).file_stem().map(|s| s.to_string_lossy().into_owned());
    let stem = stem.unwrap_or_else(|| name.to_owned());
    let extension = Path::new(name).extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1;
    loop {
        let next_name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(next_name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
