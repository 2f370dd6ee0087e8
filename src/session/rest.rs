// src/session/rest.rs

//! iControl REST implementation of [`DeviceSession`]
//!
//! Wraps a blocking reqwest client authenticated with basic credentials.
//! Certificate validation is disabled because appliances ship with
//! self-signed management certificates.

use super::{DeviceSession, Image, InstallOptions, RebootTarget, Volume, shell_quote};
use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const SYS_PATH: &str = "/mgmt/tm/sys";
const BASH_PATH: &str = "/mgmt/tm/util/bash";
const UNIX_LS_PATH: &str = "/mgmt/tm/util/unix-ls";
const VOLUME_PATH: &str = "/mgmt/tm/sys/software/volume";
const IMAGE_PATH: &str = "/mgmt/tm/sys/software/image";

/// Host and basic-auth credentials for one appliance
#[derive(Debug, Clone)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Build a client for the management and upload endpoints
pub(crate) fn build_client(request_timeout: Option<Duration>) -> Result<Client> {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(request_timeout)
        .build()
        .map_err(|e| Error::HttpError(format!("Failed to create HTTP client: {e}")))
}

/// Session against the iControl REST API
pub struct RestSession {
    credentials: Credentials,
    request_timeout: Option<Duration>,
    client: Client,
}

/// `{"items": [...]}` envelope of collection endpoints
#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct VolumeRecord {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    basebuild: String,
    #[serde(default)]
    status: String,
    active: Option<bool>,
}

impl From<VolumeRecord> for Volume {
    fn from(record: VolumeRecord) -> Self {
        Volume {
            name: record.name,
            version: record.version,
            basebuild: record.basebuild,
            status: record.status,
            active: record.active.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    name: String,
    #[serde(rename = "fullPath")]
    full_path: Option<String>,
    #[serde(default)]
    version: String,
    #[serde(default)]
    build: String,
}

impl From<ImageRecord> for Image {
    fn from(record: ImageRecord) -> Self {
        Image {
            name: record.full_path.unwrap_or(record.name),
            version: record.version,
            build: record.build,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UtilResult {
    #[serde(rename = "commandResult")]
    command_result: Option<String>,
}

impl UtilResult {
    fn into_output(self) -> Option<String> {
        self.command_result.filter(|s| !s.trim().is_empty())
    }
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::CommandFailed(format!("Unusable {what} response: {e}")))
}

/// Report a failed inventory query or utility run as `CommandFailed`
fn query_failed(err: Error) -> Error {
    match err {
        Error::HttpError(msg) | Error::ParseError(msg) => Error::CommandFailed(msg),
        other => other,
    }
}

/// `utilCmdArgs` running `command` through `bash -c`
fn bash_args(command: &str) -> String {
    format!("-c {}", shell_quote(command))
}

fn decode_volumes(body: &str) -> Result<Vec<Volume>> {
    let collection: Collection<VolumeRecord> = decode(body, "volume collection")?;
    Ok(collection.items.into_iter().map(Volume::from).collect())
}

fn decode_images(body: &str) -> Result<Vec<Image>> {
    let collection: Collection<ImageRecord> = decode(body, "image collection")?;
    Ok(collection.items.into_iter().map(Image::from).collect())
}

fn install_body(image: &str, volume: &str, options: InstallOptions) -> serde_json::Value {
    let mut opts = Vec::new();
    if options.create_volume {
        opts.push(json!({ "create-volume": true }));
    }
    json!({
        "command": "install",
        "name": image,
        "volume": volume,
        "options": opts,
    })
}

fn reboot_body(target: &RebootTarget) -> serde_json::Value {
    match target {
        RebootTarget::InPlace => json!({ "command": "reboot" }),
        RebootTarget::Volume(name) => json!({ "command": "reboot", "volume": name }),
    }
}

impl RestSession {
    /// Create a session without contacting the appliance
    pub fn new(credentials: Credentials, request_timeout: Option<Duration>) -> Result<Self> {
        let client = build_client(request_timeout)?;
        Ok(Self {
            credentials,
            request_timeout,
            client,
        })
    }

    /// Create a session and verify the appliance answers
    pub fn connect(credentials: Credentials, request_timeout: Option<Duration>) -> Result<Self> {
        let session = Self::new(credentials, request_timeout)?;
        session.probe()?;
        info!("Connected to {}", session.credentials.host);
        Ok(session)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!("https://{}{}", self.credentials.host, path)
    }

    fn get(&self, path: &str) -> Result<Response> {
        let url = self.url(path);
        debug!("GET {}", url);
        self.client
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .map_err(|e| Error::HttpError(format!("Failed to fetch {url}: {e}")))
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response> {
        let url = self.url(path);
        debug!("POST {} {}", url, body);
        self.client
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(body)
            .send()
            .map_err(|e| Error::HttpError(format!("Failed to post to {url}: {e}")))
    }

    /// Read the body of a successful response
    fn success_body(response: Response) -> Result<String> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::CommandFailed(format!(
                "HTTP {status} from {url}: {}",
                detail.trim()
            )));
        }
        response
            .text()
            .map_err(|e| Error::HttpError(format!("Failed to read response from {url}: {e}")))
    }

    fn run_util(&self, path: &str, args: &str) -> Result<Option<String>> {
        let body = json!({ "command": "run", "utilCmdArgs": args });
        let text = self
            .post(path, &body)
            .and_then(Self::success_body)
            .map_err(query_failed)?;
        let result: UtilResult = decode(&text, "utility")?;
        Ok(result.into_output())
    }

    /// GET `path` and return the body of a successful response
    fn query(&self, path: &str) -> Result<String> {
        self.get(path)
            .and_then(Self::success_body)
            .map_err(query_failed)
    }

    fn probe(&self) -> Result<()> {
        Self::success_body(self.get(SYS_PATH)?).map(|_| ())
    }
}

impl DeviceSession for RestSession {
    fn run_bash(&self, command: &str) -> Result<Option<String>> {
        self.run_util(BASH_PATH, &bash_args(command))
    }

    fn list_directory(&self, path: &str) -> Result<Option<String>> {
        self.run_util(UNIX_LS_PATH, path)
    }

    fn list_volumes(&self) -> Result<Vec<Volume>> {
        decode_volumes(&self.query(VOLUME_PATH)?)
    }

    fn volume_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .get(&format!("{VOLUME_PATH}/{name}"))
            .map_err(query_failed)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::success_body(response).map_err(query_failed).map(|_| true)
    }

    fn list_images(&self) -> Result<Vec<Image>> {
        decode_images(&self.query(IMAGE_PATH)?)
    }

    fn issue_install(&self, image: &str, volume: &str, options: InstallOptions) -> Result<()> {
        info!("Requesting install of {} on {}", image, volume);
        Self::success_body(self.post(IMAGE_PATH, &install_body(image, volume, options))?)
            .map(|_| ())
    }

    fn issue_reboot(&self, target: &RebootTarget) -> Result<()> {
        info!("Requesting reboot ({:?})", target);
        Self::success_body(self.post(VOLUME_PATH, &reboot_body(target))?).map(|_| ())
    }

    fn load_volume(&self, name: &str) -> Result<Volume> {
        let text = self.query(&format!("{VOLUME_PATH}/{name}"))?;
        let record: VolumeRecord = decode(&text, "volume")?;
        Ok(record.into())
    }

    fn reconnect(&mut self) -> Result<()> {
        debug!("Reconnecting to {}", self.credentials.host);
        self.client = build_client(self.request_timeout)?;
        self.probe()
    }
}
