use crate::{
    authentication::{ResetToken, SessionId, hash_password, verify_password},
    db::{Db, UserChange, UserFilter},
    error::{Error, Result},
    shutdown_actor::ShutdownActorHandler,
    user::{User, UserId},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::spawn_blocking,
};
use tracing::instrument;

pub enum AuthenticationActorEvent {
    ValidLogin {
        email: String,
        password: String,
        response_sender: oneshot::Sender<Result<bool>>,
    },
    RegisterUser {
        email: String,
        password: String,
        response_sender: oneshot::Sender<Result<User>>,
    },
    CreateSession {
        email: String,
        response_sender: oneshot::Sender<Result<Option<SessionId>>>,
    },
    GetUserFromSessionId {
        session_id: Option<SessionId>,
        response_sender: oneshot::Sender<Result<Option<User>>>,
    },
    DestroySession {
        user_id: UserId,
        response_sender: oneshot::Sender<Result<()>>,
    },
    GetResetPasswordToken {
        email: String,
        response_sender: oneshot::Sender<Result<ResetToken>>,
    },
    UpdatePassword {
        reset_token: Option<ResetToken>,
        password: Option<String>,
        response_sender: oneshot::Sender<Result<()>>,
    },
}

/// Owns the user database and serializes every account mutation.
#[derive(Debug)]
pub struct AuthenticationActor {
    db: Db,
}

/// Treats a missing row as `None` and passes every other error through.
fn optional(result: Result<User>) -> Result<Option<User>> {
    match result {
        Ok(user) => Ok(Some(user)),
        Err(Error::NoResultFound) => Ok(None),
        Err(e) => Err(e),
    }
}

impl AuthenticationActor {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn valid_login(&mut self, email: String, password: String) -> Result<bool> {
        let Some(user) = optional(self.db.find_user_by(UserFilter::Email(email)).await)? else {
            return Ok(false);
        };
        let hashed_password = user.hashed_password;
        Ok(spawn_blocking(move || verify_password(&hashed_password, &password)).await?)
    }

    async fn register_user(&mut self, email: String, password: String) -> Result<User> {
        if optional(self.db.find_user_by(UserFilter::Email(email.clone())).await)?.is_some() {
            return Err(Error::UserAlreadyExists(email));
        }
        let hashed_password = spawn_blocking(move || hash_password(&password)).await??;
        let user = self.db.add_user(&email, &hashed_password).await?;
        tracing::info!("registered user {}", user.id);
        Ok(user)
    }

    async fn create_session(&mut self, email: String) -> Result<Option<SessionId>> {
        let Some(user) = optional(self.db.find_user_by(UserFilter::Email(email)).await)? else {
            return Ok(None);
        };
        let session_id = SessionId::generate();
        self.db
            .update_user(user.id, vec![UserChange::SessionId(Some(session_id.0.clone()))])
            .await?;
        tracing::debug!("created session for user {}", user.id);
        Ok(Some(session_id))
    }

    async fn get_user_from_session_id(
        &mut self,
        session_id: Option<SessionId>,
    ) -> Result<Option<User>> {
        let Some(SessionId(session_id)) = session_id else {
            return Ok(None);
        };
        optional(
            self.db
                .find_user_by(UserFilter::SessionId(session_id))
                .await,
        )
    }

    async fn destroy_session(&mut self, user_id: UserId) -> Result<()> {
        self.db
            .update_user(user_id, vec![UserChange::SessionId(None)])
            .await?;
        tracing::debug!("destroyed session of user {}", user_id);
        Ok(())
    }

    async fn get_reset_password_token(&mut self, email: String) -> Result<ResetToken> {
        let Some(user) = optional(self.db.find_user_by(UserFilter::Email(email)).await)? else {
            return Err(Error::UnknownEmail);
        };
        let reset_token = ResetToken::generate();
        self.db
            .update_user(
                user.id,
                vec![UserChange::ResetToken(Some(reset_token.0.clone()))],
            )
            .await?;
        tracing::info!("issued reset token for user {}", user.id);
        Ok(reset_token)
    }

    async fn update_password(
        &mut self,
        reset_token: Option<ResetToken>,
        password: Option<String>,
    ) -> Result<()> {
        let (Some(ResetToken(reset_token)), Some(password)) = (reset_token, password) else {
            return Err(Error::InvalidResetToken);
        };
        let Some(user) = optional(
            self.db
                .find_user_by(UserFilter::ResetToken(reset_token))
                .await,
        )?
        else {
            return Err(Error::InvalidResetToken);
        };
        let hashed_password = spawn_blocking(move || hash_password(&password)).await??;
        self.db
            .update_user(
                user.id,
                vec![
                    UserChange::HashedPassword(hashed_password),
                    UserChange::ResetToken(None),
                ],
            )
            .await?;
        tracing::info!("updated password for user {}", user.id);
        Ok(())
    }

    fn respond<T>(response_sender: oneshot::Sender<T>, response: T, event: &str) {
        if response_sender.send(response).is_err() {
            tracing::error!(
                "Error responding to AuthenticationActorEvent::{}: receiver dropped",
                event
            );
        }
    }

    #[instrument(level = "trace")]
    pub async fn run(mut self, mut receiver: mpsc::Receiver<AuthenticationActorEvent>) {
        tracing::debug!("actor started");
        while let Some(msg) = receiver.recv().await {
            match msg {
                AuthenticationActorEvent::ValidLogin {
                    email,
                    password,
                    response_sender,
                } => {
                    let response = self.valid_login(email, password).await;
                    Self::respond(response_sender, response, "ValidLogin");
                }
                AuthenticationActorEvent::RegisterUser {
                    email,
                    password,
                    response_sender,
                } => {
                    let response = self.register_user(email, password).await;
                    Self::respond(response_sender, response, "RegisterUser");
                }
                AuthenticationActorEvent::CreateSession {
                    email,
                    response_sender,
                } => {
                    let response = self.create_session(email).await;
                    Self::respond(response_sender, response, "CreateSession");
                }
                AuthenticationActorEvent::GetUserFromSessionId {
                    session_id,
                    response_sender,
                } => {
                    let response = self.get_user_from_session_id(session_id).await;
                    Self::respond(response_sender, response, "GetUserFromSessionId");
                }
                AuthenticationActorEvent::DestroySession {
                    user_id,
                    response_sender,
                } => {
                    let response = self.destroy_session(user_id).await;
                    Self::respond(response_sender, response, "DestroySession");
                }
                AuthenticationActorEvent::GetResetPasswordToken {
                    email,
                    response_sender,
                } => {
                    let response = self.get_reset_password_token(email).await;
                    Self::respond(response_sender, response, "GetResetPasswordToken");
                }
                AuthenticationActorEvent::UpdatePassword {
                    reset_token,
                    password,
                    response_sender,
                } => {
                    let response = self.update_password(reset_token, password).await;
                    Self::respond(response_sender, response, "UpdatePassword");
                }
            }
        }
        tracing::debug!("actor stopped");
    }
}

/// Cloneable front end to the [`AuthenticationActor`].
#[derive(Clone, Debug)]
pub struct AuthenticationActorHandler {
    sender: mpsc::Sender<AuthenticationActorEvent>,
}

impl AuthenticationActorHandler {
    pub async fn new(shutdown_handler: &ShutdownActorHandler, db: Db) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<AuthenticationActorEvent>(64);
        shutdown_handler.add_database(db.clone()).await?;
        let actor = AuthenticationActor::new(db);
        let join_handle = tokio::task::spawn(actor.run(receiver));
        shutdown_handler.add_join_handle(join_handle).await?;
        Ok(Self { sender })
    }

    /// Spawns the actor without lifecycle tracking.
    #[cfg(test)]
    pub fn spawn(db: Db) -> Self {
        let (sender, receiver) = mpsc::channel::<AuthenticationActorEvent>(64);
        tokio::task::spawn(AuthenticationActor::new(db).run(receiver));
        Self { sender }
    }

    async fn request<T>(
        &self,
        make_event: impl FnOnce(oneshot::Sender<Result<T>>) -> AuthenticationActorEvent,
    ) -> Result<T> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.sender.send(make_event(response_sender)).await?;
        response_receiver.await?
    }

    pub async fn valid_login(&self, email: String, password: String) -> Result<bool> {
        self.request(|response_sender| AuthenticationActorEvent::ValidLogin {
            email,
            password,
            response_sender,
        })
        .await
    }

    pub async fn register_user(&self, email: String, password: String) -> Result<User> {
        self.request(|response_sender| AuthenticationActorEvent::RegisterUser {
            email,
            password,
            response_sender,
        })
        .await
    }

    pub async fn create_session(&self, email: String) -> Result<Option<SessionId>> {
        self.request(|response_sender| AuthenticationActorEvent::CreateSession {
            email,
            response_sender,
        })
        .await
    }

    pub async fn get_user_from_session_id(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Option<User>> {
        self.request(
            |response_sender| AuthenticationActorEvent::GetUserFromSessionId {
                session_id,
                response_sender,
            },
        )
        .await
    }

    pub async fn destroy_session(&self, user_id: UserId) -> Result<()> {
        self.request(|response_sender| AuthenticationActorEvent::DestroySession {
            user_id,
            response_sender,
        })
        .await
    }

    pub async fn get_reset_password_token(&self, email: String) -> Result<ResetToken> {
        self.request(
            |response_sender| AuthenticationActorEvent::GetResetPasswordToken {
                email,
                response_sender,
            },
        )
        .await
    }

    pub async fn update_password(
        &self,
        reset_token: Option<ResetToken>,
        password: Option<String>,
    ) -> Result<()> {
        self.request(|response_sender| AuthenticationActorEvent::UpdatePassword {
            reset_token,
            password,
            response_sender,
        })
        .await
    }
}
