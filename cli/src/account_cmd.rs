//! Sign-in, sign-up, sign-out and profile editing.

use clap::Args;
use clap::Subcommand;
use serde_json::json;
use vantalu_core::model::{Profile, ProfileUpdate};
use vantalu_core::profile::{load_profile, update_profile};
use vantalu_core::session::{Session, SignUpOutcome, is_admin};

use crate::context::App;
use crate::output::{Palette, print_json};

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long, short = 'e')]
    pub email: String,

    #[arg(long, short = 'p', env = "VANTALU_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct SignupArgs {
    #[arg(long, short = 'e')]
    pub email: String,

    #[arg(long, short = 'p', env = "VANTALU_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Display name stored on the profile
    #[arg(long, short = 'n')]
    pub name: String,
}

pub async fn run_login(app: &App, args: LoginArgs) -> anyhow::Result<()> {
    let session = app.auth()?.sign_in(&args.email, &args.password).await?;
    app.sessions().save(&session)?;
    tracing::info!(user_id = %session.user.id, "signed in");
    report_signed_in(app, &session).await
}

pub async fn run_signup(app: &App, args: SignupArgs) -> anyhow::Result<()> {
    let outcome = app
        .auth()?
        .sign_up(&args.email, &args.password, &args.name)
        .await?;
    match outcome {
        SignUpOutcome::SignedIn(session) => {
            app.sessions().save(&session)?;
            tracing::info!(user_id = %session.user.id, "signed up");
            report_signed_in(app, &session).await
        }
        SignUpOutcome::ConfirmationRequired { user_id, email } => {
            if app.json {
                return print_json(&json!({
                    "user_id": user_id,
                    "email": email,
                    "confirmation_required": true,
                }));
            }
            println!("Check {email} for a confirmation link, then run `vantalu login`.");
            Ok(())
        }
    }
}

async fn report_signed_in(app: &App, session: &Session) -> anyhow::Result<()> {
    let admin = match app.backend(Some(session)) {
        Ok(backend) => is_admin(backend.as_ref(), session).await.unwrap_or_else(|err| {
            tracing::warn!(%err, "could not check roles");
            false
        }),
        Err(err) => {
            tracing::warn!(%err, "could not check roles");
            false
        }
    };
    if app.json {
        return print_json(&json!({ "user": session.user, "admin": admin }));
    }
    let who = session
        .user
        .name
        .as_deref()
        .or(session.user.email.as_deref())
        .unwrap_or(&session.user.id);
    println!("{} Signed in as {who}", app.palette.success("✓"));
    if admin {
        println!("  Admin console available via `vantalu admin`.");
    }
    Ok(())
}

pub async fn run_logout(app: &App) -> anyhow::Result<()> {
    let Some(session) = app.sessions().load()? else {
        println!("Not signed in.");
        return Ok(());
    };
    // Revocation is best effort; the local session is removed regardless.
    match app.auth() {
        Ok(auth) => {
            if let Err(err) = auth.sign_out(&session).await {
                tracing::warn!(%err, "server sign-out failed");
            }
        }
        Err(err) => tracing::warn!(%err, "skipping server sign-out"),
    }
    app.sessions().clear()?;
    println!("Signed out.");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show the signed-in user's profile
    Show,

    /// Change profile fields; omitted fields are left as they are
    Update(ProfileUpdateArgs),
}

#[derive(Debug, Args)]
pub struct ProfileUpdateArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Default delivery address
    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub pincode: Option<String>,
}

impl From<ProfileUpdateArgs> for ProfileUpdate {
    fn from(args: ProfileUpdateArgs) -> Self {
        Self {
            name: args.name,
            phone: args.phone,
            default_address: args.address,
            city: args.city,
            pincode: args.pincode,
        }
    }
}

pub async fn run_profile(app: &App, cmd: ProfileCommand) -> anyhow::Result<()> {
    let session = app.require_session().await?;
    let backend = app.backend(Some(&session))?;
    let profile = match cmd {
        ProfileCommand::Show => load_profile(backend.as_ref(), session.user_id()).await?,
        ProfileCommand::Update(args) => {
            update_profile(backend.as_ref(), session.user_id(), &args.into()).await?
        }
    };
    if app.json {
        return print_json(&profile);
    }
    print!("{}", render_profile(&app.palette, &profile));
    Ok(())
}

pub fn render_profile(palette: &Palette, profile: &Profile) -> String {
    let field = |value: &Option<String>| {
        value
            .clone()
            .unwrap_or_else(|| palette.dim("(not set)"))
    };
    format!(
        "Name     {}\nEmail    {}\nPhone    {}\nAddress  {}\nCity     {}\nPincode  {}\n",
        field(&profile.name),
        field(&profile.email),
        field(&profile.phone),
        field(&profile.default_address),
        field(&profile.city),
        field(&profile.pincode),
    )
}
