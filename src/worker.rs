//! Background worker for mesh partitioning.
//!
//! Keeps octree splitting off the render loop. The worker owns the
//! [`Scene`] registry; each batch of edits ends with one freshly built
//! snapshot published to the shared [`SceneStore`], so frames in flight keep
//! the snapshot they started with.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::pathtracer::{split, Material, MeshData, MeshId, Scene, SceneStore};
use crate::util::{Error, Result, Transform};

/// Commands sent to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Partition `mesh` and place it, replacing any mesh with the same id.
    Upsert {
        id: MeshId,
        mesh: MeshData,
        transform: Transform,
        materials: Vec<Material>,
        epoch: u64,
    },
    /// Move an existing mesh. No re-partitioning.
    SetTransform { id: MeshId, transform: Transform, epoch: u64 },
    Remove { id: MeshId, epoch: u64 },
    /// Stop the worker thread.
    Stop,
}

impl WorkerCommand {
    fn epoch(&self) -> Option<u64> {
        match self {
            Self::Upsert { epoch, .. } | Self::SetTransform { epoch, .. } | Self::Remove { epoch, .. } => {
                Some(*epoch)
            }
            Self::Stop => None,
        }
    }

    /// Id whose whole state this command replaces.
    ///
    /// An upsert that will be rejected replaces nothing, so whatever it
    /// would have overwritten stays in the batch.
    fn replaces(&self) -> Option<MeshId> {
        match self {
            Self::Upsert { id, mesh, materials, .. } => {
                (!materials.is_empty() && split::check_mesh(mesh).is_ok()).then_some(*id)
            }
            Self::Remove { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Results sent back from the worker.
#[derive(Debug)]
pub enum WorkerResult {
    /// A snapshot was published.
    Published {
        generation: u64,
        /// Epoch of the newest command in the batch
        epoch: u64,
        triangles: usize,
    },
    /// A command was rejected; the rest of its batch still applied.
    Failed { id: MeshId, epoch: u64, error: Error },
}

/// Handle to the background partition thread.
pub struct PartitionWorker {
    tx: Sender<WorkerCommand>,
    rx: Receiver<WorkerResult>,
    store: SceneStore,
    handle: Option<JoinHandle<()>>,
}

impl PartitionWorker {
    /// Spawn a worker publishing into `store`.
    pub fn spawn(store: SceneStore) -> Self {
        let (cmd_tx, cmd_rx) = channel::<WorkerCommand>();
        let (res_tx, res_rx) = channel::<WorkerResult>();

        let worker_store = store.clone();
        let handle = thread::Builder::new()
            .name("meshtrace-partition".into())
            .spawn(move || worker_loop(worker_store, cmd_rx, res_tx))
            .ok();
        if handle.is_none() {
            tracing::error!("failed to spawn partition worker thread");
        }

        Self {
            tx: cmd_tx,
            rx: res_rx,
            store,
            handle,
        }
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    /// Queue a command.
    pub fn send(&self, cmd: WorkerCommand) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::WorkerDisconnected)
    }

    pub fn upsert(
        &self,
        id: MeshId,
        mesh: MeshData,
        transform: Transform,
        materials: Vec<Material>,
        epoch: u64,
    ) -> Result<()> {
        self.send(WorkerCommand::Upsert {
            id,
            mesh,
            transform,
            materials,
            epoch,
        })
    }

    pub fn set_transform(&self, id: MeshId, transform: Transform, epoch: u64) -> Result<()> {
        self.send(WorkerCommand::SetTransform { id, transform, epoch })
    }

    pub fn remove(&self, id: MeshId, epoch: u64) -> Result<()> {
        self.send(WorkerCommand::Remove { id, epoch })
    }

    /// Check for ready results (non-blocking).
    pub fn try_recv(&self) -> Option<WorkerResult> {
        self.rx.try_recv().ok()
    }

    /// Block until the next result.
    pub fn recv(&self) -> Result<WorkerResult> {
        self.rx.recv().map_err(|_| Error::WorkerDisconnected)
    }

    /// Block until a snapshot at or past `epoch` is published.
    ///
    /// Failures seen on the way are returned in order.
    pub fn wait_for_epoch(&self, epoch: u64) -> Result<(u64, Vec<WorkerResult>)> {
        let mut failures = Vec::new();
        loop {
            match self.recv()? {
                WorkerResult::Published {
                    generation,
                    epoch: e,
                    ..
                } if e >= epoch => return Ok((generation, failures)),
                WorkerResult::Published { .. } => {}
                failed @ WorkerResult::Failed { .. } => failures.push(failed),
            }
        }
    }

    /// Stop the worker and wait for it to finish.
    pub fn stop(&mut self) {
        let _ = self.tx.send(WorkerCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PartitionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(store: SceneStore, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResult>) {
    let mut scene = Scene::new();
    loop {
        let cmd = match rx.recv() {
            Ok(cmd) => cmd,
            Err(_) => break,
        };
        if matches!(cmd, WorkerCommand::Stop) {
            break;
        }

        let (batch, stop) = drain_to_latest(&rx, cmd);
        let epoch = batch.iter().filter_map(WorkerCommand::epoch).max().unwrap_or(0);

        for cmd in batch {
            if let Err((id, epoch, error)) = apply(&mut scene, cmd) {
                tracing::warn!(id, epoch, "rebuild rejected: {error}");
                if tx.send(WorkerResult::Failed { id, epoch, error }).is_err() {
                    return;
                }
            }
        }

        let snapshot = scene.snapshot();
        let triangles = snapshot.triangle_count();
        let generation = store.publish(snapshot);
        tracing::debug!(generation, epoch, triangles, "snapshot published");

        if tx
            .send(WorkerResult::Published {
                generation,
                epoch,
                triangles,
            })
            .is_err()
        {
            break;
        }
        if stop {
            break;
        }
    }
}

fn apply(scene: &mut Scene, cmd: WorkerCommand) -> std::result::Result<(), (MeshId, u64, Error)> {
    match cmd {
        WorkerCommand::Upsert {
            id,
            mesh,
            transform,
            materials,
            epoch,
        } => scene
            .add_mesh(id, &mesh, transform, materials)
            .map_err(|e| (id, epoch, e)),
        WorkerCommand::SetTransform { id, transform, epoch } => {
            scene.set_transform(id, transform).map_err(|e| (id, epoch, e))
        }
        WorkerCommand::Remove { id, .. } => {
            scene.remove(id);
            Ok(())
        }
        WorkerCommand::Stop => Ok(()),
    }
}

/// Collect everything queued behind `first` into one batch.
///
/// A remove, or an upsert that passes the checks partitioning would
/// make, makes every earlier command for the same id irrelevant, so those
/// are dropped before any partitioning happens. A queued `Stop` ends the
/// batch and is reported through the flag.
fn drain_to_latest(rx: &Receiver<WorkerCommand>, first: WorkerCommand) -> (Vec<WorkerCommand>, bool) {
    let mut batch = vec![first];
    let mut stop = false;
    while let Ok(cmd) = rx.try_recv() {
        if matches!(cmd, WorkerCommand::Stop) {
            stop = true;
            break;
        }
        batch.push(cmd);
    }

    let mut keep = vec![true; batch.len()];
    for (i, cmd) in batch.iter().enumerate() {
        if let Some(id) = cmd.replaces() {
            for (j, earlier) in batch[..i].iter().enumerate() {
                let same_id = match earlier {
                    WorkerCommand::Upsert { id: e, .. }
                    | WorkerCommand::SetTransform { id: e, .. }
                    | WorkerCommand::Remove { id: e, .. } => *e == id,
                    WorkerCommand::Stop => false,
                };
                if same_id {
                    keep[j] = false;
                }
            }
        }
    }
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        tracing::trace!(dropped, "superseded commands skipped");
    }
    let batch = batch
        .into_iter()
        .zip(keep)
        .filter_map(|(cmd, k)| k.then_some(cmd))
        .collect();
    (batch, stop)
}
