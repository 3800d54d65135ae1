pub mod server;
pub mod superuser;

mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    CreateSuperuser(superuser::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
