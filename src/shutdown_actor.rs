use crate::db::Db;
use tokio::task::JoinSet;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::instrument;

#[derive(Debug)]
enum ShutdownActorEvent {
    AddJoinHandle(JoinHandle<()>),
    AddDatabase(Db),
}

/// Waits for every registered task to finish once all handlers are gone,
/// then closes the registered databases.
#[derive(Debug)]
struct ShutdownActor {
    receiver: mpsc::Receiver<ShutdownActorEvent>,
    join_handles: Vec<JoinHandle<()>>,
    databases: Vec<Db>,
}

impl ShutdownActor {
    fn new(receiver: mpsc::Receiver<ShutdownActorEvent>) -> Self {
        let join_handles = Vec::new();
        let databases = Vec::new();
        Self {
            receiver,
            join_handles,
            databases,
        }
    }

    async fn shutdown(&mut self) {
        for join_handle in self.join_handles.drain(..) {
            tracing::debug!("Joining {:?}", join_handle);
            if let Err(e) = join_handle.await {
                tracing::error!("Task failed during shutdown: {}", e);
            }
        }
        // tasks are joined first so no query is cut off by a closing pool
        for db in self.databases.drain(..) {
            tracing::debug!("Closing {:?}", db);
            db.close().await;
        }
    }

    #[instrument]
    async fn run(mut self) {
        tracing::debug!("actor started");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ShutdownActorEvent::AddJoinHandle(join_handle) => {
                    tracing::debug!("Added join handle {:?}", &join_handle);
                    self.join_handles.push(join_handle);
                }
                ShutdownActorEvent::AddDatabase(db) => {
                    tracing::debug!("Added database {:?}", &db);
                    self.databases.push(db);
                }
            }
        }
        self.shutdown().await;
        tracing::debug!("actor stopped");
    }
}

#[derive(Debug)]
pub struct ShutdownActorHandler {
    sender: mpsc::Sender<ShutdownActorEvent>,
}

impl ShutdownActorHandler {
    pub fn new(join_set: &mut JoinSet<()>) -> Self {
        let (tx, rx) = mpsc::channel::<ShutdownActorEvent>(8);
        let actor = ShutdownActor::new(rx);

        join_set.spawn(actor.run());

        Self { sender: tx }
    }

    pub async fn add_join_handle(&self, join_handle: JoinHandle<()>) -> crate::error::Result<()> {
        self.sender
            .send(ShutdownActorEvent::AddJoinHandle(join_handle))
            .await?;
        Ok(())
    }

    pub async fn add_database(&self, db: Db) -> crate::error::Result<()> {
        self.sender.send(ShutdownActorEvent::AddDatabase(db)).await?;
        Ok(())
    }
}
