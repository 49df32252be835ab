//! Disposable MongoDB instances, one per measured iteration.

use crate::error::BenchError;
use async_trait::async_trait;
use bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use nested_docs_generator::OuterDocument;
use std::net::TcpListener;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Database name used inside throwaway containers.
const CONTAINER_DATABASE: &str = "testdb";

/// Driver timeouts applied to every benchmark client.
///
/// Large datasets can keep a single aggregation busy for minutes, so both
/// default to something far above the driver's own defaults.
#[derive(Debug, Clone, Copy)]
pub struct ClientTimeouts {
    pub connect: Duration,
    pub server_selection: Duration,
}

impl ClientTimeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            server_selection: timeout,
        }
    }
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(600))
    }
}

async fn connect(connection_string: &str, timeouts: ClientTimeouts) -> Result<Client, BenchError> {
    let mut options = ClientOptions::parse(connection_string).await?;
    options.app_name = Some("mongo-filtering".to_string());
    options.connect_timeout = Some(timeouts.connect);
    options.server_selection_timeout = Some(timeouts.server_selection);
    Ok(Client::with_options(options)?)
}

/// Source of fresh, isolated databases.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Short description used in logs.
    fn describe(&self) -> String;

    /// Start (or allocate) a new instance that nothing else uses.
    async fn provision(&self) -> Result<EphemeralInstance, BenchError>;
}

enum Teardown {
    Container(MongoContainer),
    DropDatabase,
}

/// A database owned by exactly one iteration.
///
/// Call [`EphemeralInstance::teardown`] when done. If the instance is dropped
/// instead, a container-backed instance still stops its container.
pub struct EphemeralInstance {
    client: Client,
    database: Database,
    teardown: Teardown,
}

impl EphemeralInstance {
    /// A typed handle on a collection in this instance.
    pub fn collection(&self, name: &str) -> Collection<OuterDocument> {
        self.database.collection(name)
    }

    /// Release the instance: stop its container or drop its database.
    pub async fn teardown(self) -> Result<(), BenchError> {
        let EphemeralInstance {
            client,
            database,
            teardown,
        } = self;

        match teardown {
            Teardown::Container(mut container) => {
                client.shutdown().await;
                container.stop()
            }
            Teardown::DropDatabase => {
                debug!("Dropping database: {}", database.name());
                let dropped = database.drop().await;
                client.shutdown().await;
                dropped.map_err(BenchError::from)
            }
        }
    }
}

/// Configuration and handle for one MongoDB Docker container.
pub struct MongoContainer {
    /// Container name
    pub container_name: String,
    /// Host port bound to the container's 27017
    pub host_port: u16,
    /// Image name
    pub image_name: String,
    /// Connection string for the container
    pub connection_string: String,
    running: bool,
}

impl MongoContainer {
    /// Creates a new container configuration
    pub fn new(container_name: &str, host_port: u16, image_name: &str) -> Self {
        let connection_string =
            format!("mongodb://127.0.0.1:{host_port}/?directConnection=true");

        Self {
            container_name: container_name.to_string(),
            host_port,
            image_name: image_name.to_string(),
            connection_string,
            running: false,
        }
    }

    /// Starts the container
    pub fn start(&mut self) -> Result<(), BenchError> {
        info!("Starting MongoDB container: {}", self.container_name);

        let output = Command::new("docker")
            .args([
                "run",
                "--name",
                &self.container_name,
                "-p",
                &format!("127.0.0.1:{}:27017", self.host_port),
                "-d",
                &self.image_name,
            ])
            .output()
            .map_err(|e| BenchError::Provision(format!("failed to run docker: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::Provision(format!(
                "failed to start container {}: {}",
                self.container_name,
                stderr.trim()
            )));
        }

        self.running = true;
        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Started container: {}", container_id);

        Ok(())
    }

    /// Waits for MongoDB to answer `ping`
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), BenchError> {
        let start = Instant::now();
        let probe_timeouts = ClientTimeouts::uniform(Duration::from_secs(1));

        while start.elapsed() < timeout {
            match self.ping(probe_timeouts).await {
                Ok(()) => {
                    info!(
                        "MongoDB container {} ready after {:?}",
                        self.container_name,
                        start.elapsed()
                    );
                    return Ok(());
                }
                Err(e) => {
                    debug!("Connection attempt failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            }
        }

        Err(BenchError::Provision(format!(
            "MongoDB container {} did not become ready within {timeout:?}",
            self.container_name
        )))
    }

    async fn ping(&self, timeouts: ClientTimeouts) -> Result<(), BenchError> {
        let client = connect(&self.connection_string, timeouts).await?;
        let result = client.database("admin").run_command(doc! { "ping": 1 }).await;
        client.shutdown().await;
        result?;
        Ok(())
    }

    /// Stops and removes the container
    pub fn stop(&mut self) -> Result<(), BenchError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;

        info!("Stopping container: {}", self.container_name);

        let output = Command::new("docker")
            .args(["rm", "--force", &self.container_name])
            .stdout(Stdio::null())
            .output()
            .map_err(|e| BenchError::Provision(format!("failed to run docker: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::Provision(format!(
                "failed to remove container {}: {}",
                self.container_name,
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// Gets logs from the container
    pub fn logs(&self) -> Result<String, BenchError> {
        let output = Command::new("docker")
            .args(["logs", &self.container_name])
            .output()
            .map_err(|e| BenchError::Provision(format!("failed to run docker: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(format!("STDOUT:\n{stdout}\n\nSTDERR:\n{stderr}"))
    }
}

impl Drop for MongoContainer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Container cleanup failed: {}", e);
        }
    }
}

/// Ask the OS for a port that is free right now.
fn free_local_port() -> Result<u16, BenchError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| BenchError::Provision(format!("failed to reserve a local port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| BenchError::Provision(format!("failed to read local port: {e}")))?
        .port();
    Ok(port)
}

/// Starts a brand new MongoDB container for every instance.
pub struct DockerProvisioner {
    image: String,
    startup_timeout: Duration,
    timeouts: ClientTimeouts,
}

impl DockerProvisioner {
    pub fn new(image: &str, startup_timeout: Duration, timeouts: ClientTimeouts) -> Self {
        Self {
            image: image.to_string(),
            startup_timeout,
            timeouts,
        }
    }
}

#[async_trait]
impl Provisioner for DockerProvisioner {
    fn describe(&self) -> String {
        format!("docker ({})", self.image)
    }

    async fn provision(&self) -> Result<EphemeralInstance, BenchError> {
        let name = format!("mongo-filtering-{}", Uuid::new_v4().simple());
        let mut container = MongoContainer::new(&name, free_local_port()?, &self.image);

        container.start()?;
        if let Err(e) = container.wait_until_ready(self.startup_timeout).await {
            if let Ok(logs) = container.logs() {
                debug!("Container logs for {}:\n{}", name, logs);
            }
            return Err(e);
        }

        let client = connect(&container.connection_string, self.timeouts).await?;
        let database = client.database(CONTAINER_DATABASE);

        Ok(EphemeralInstance {
            client,
            database,
            teardown: Teardown::Container(container),
        })
    }
}

/// Uses an already running server and hands out a fresh database per instance.
pub struct ExistingServerProvisioner {
    connection_string: String,
    timeouts: ClientTimeouts,
}

impl ExistingServerProvisioner {
    pub fn new(connection_string: &str, timeouts: ClientTimeouts) -> Self {
        Self {
            connection_string: connection_string.to_string(),
            timeouts,
        }
    }
}

#[async_trait]
impl Provisioner for ExistingServerProvisioner {
    fn describe(&self) -> String {
        "existing server".to_string()
    }

    async fn provision(&self) -> Result<EphemeralInstance, BenchError> {
        let client = connect(&self.connection_string, self.timeouts).await?;
        let database_name = format!("mongo_filtering_{}", Uuid::new_v4().simple());
        let database = client.database(&database_name);

        // Fail here rather than inside the timed query
        database.run_command(doc! { "ping": 1 }).await?;
        debug!("Allocated database: {}", database_name);

        Ok(EphemeralInstance {
            client,
            database,
            teardown: Teardown::DropDatabase,
        })
    }
}
