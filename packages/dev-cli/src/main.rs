// Interactive driver for the FrooteX auth flows.
//
// Wires the flow controller against the hosted backend when the environment
// is configured, or against the in-memory mock services otherwise, and walks
// the email and phone paths from the terminal.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_core::flow::{AuthFlowController, AuthPhase, SignupForm};
use auth_core::kernel::test_dependencies::{
    MockDocumentStore, MockHumanVerification, MockIdentityProvider,
};
use auth_core::kernel::{firebase_deps, BaseIdentityProvider, BaseNavigator, FlowDeps};
use auth_core::models::{CountryCode, Destination, Role};
use auth_core::session::{guard_protected_route, SessionTracker};
use auth_core::Config;

/// Routing surface of the console: destinations are printed, not loaded.
struct PrintNavigator;

impl BaseNavigator for PrintNavigator {
    fn navigate(&self, destination: Destination) {
        println!(
            "{} {}",
            "navigate ->".bright_blue().bold(),
            destination.as_path().bold()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,auth_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let term = Term::stdout();
    print_banner(&term)?;

    let navigator: Arc<dyn BaseNavigator> = Arc::new(PrintNavigator);
    let deps = match Config::from_env() {
        Ok(config) => {
            println!("{}", "Using hosted backend from environment".green());
            firebase_deps(&config, navigator)
        }
        Err(_) => {
            println!(
                "{}",
                "No backend configured - running offline with mock services".yellow()
            );
            offline_deps(navigator)
        }
    };

    let mut controller = AuthFlowController::new(deps.clone());

    // Main interactive loop
    loop {
        println!();
        let options = vec![
            "Sign in with email",
            "Create account (email)",
            "Phone sign in / sign up",
            "Show session state",
            "Sign out",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact_on(&term)?;

        match selection {
            0 => email_sign_in(&mut controller).await?,
            1 => email_sign_up(&mut controller).await?,
            2 => phone_flow(&mut controller, &term).await?,
            3 => show_session(&deps),
            4 => sign_out(&deps).await,
            5 => {
                println!("{}", "Goodbye!".bright_blue());
                break;
            }
            _ => unreachable!(),
        }

        // each completed flow starts over with a fresh controller
        if controller.phase().is_resolved() {
            controller = AuthFlowController::new(deps.clone());
        }
    }

    Ok(())
}

fn print_banner(term: &Term) -> Result<()> {
    term.clear_screen()?;
    println!("{}", "FrooteX auth console".bright_green().bold());
    println!(
        "{}",
        "farm-fresh supply chain - sign in, pick a role, land on your dashboard".dimmed()
    );
    Ok(())
}

fn offline_deps(navigator: Arc<dyn BaseNavigator>) -> FlowDeps {
    let identity = Arc::new(
        MockIdentityProvider::new()
            .with_password_user("farmer@frootex.dev", "orchard", "demo-farmer")
            .with_phone_user("+919876543210", "demo-phone"),
    );
    let documents = Arc::new(MockDocumentStore::new().with_document(
        "users",
        "demo-farmer",
        json!({
            "uid": "demo-farmer",
            "name": "Demo Farmer",
            "email": "farmer@frootex.dev",
            "role": "Farmer",
            "signupMethod": "email",
            "createdAt": "2025-01-01T00:00:00Z",
        }),
    ));
    println!("  demo email account: farmer@frootex.dev / orchard");
    println!("  any 10-digit phone works; the accepted code is 123456");
    FlowDeps {
        identity,
        documents,
        verification: Arc::new(MockHumanVerification::new()),
        navigator,
        country_code: CountryCode::default(),
    }
}

async fn email_sign_in(controller: &mut AuthFlowController) -> Result<()> {
    let email: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Email")
        .allow_empty(true)
        .interact_text()?;
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?;

    controller.sign_in_with_email(&email, &password).await;
    report(controller);
    Ok(())
}

async fn email_sign_up(controller: &mut AuthFlowController) -> Result<()> {
    let role = pick_role()?;
    let name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Name")
        .allow_empty(true)
        .interact_text()?;
    let email: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Email")
        .allow_empty(true)
        .interact_text()?;
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?;

    controller
        .sign_up_with_email(SignupForm {
            name,
            email,
            password,
            role,
        })
        .await;
    report(controller);
    Ok(())
}

async fn phone_flow(controller: &mut AuthFlowController, term: &Term) -> Result<()> {
    let role = pick_role()?;
    controller.select_role(role);

    let digits: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("10-digit phone number")
        .allow_empty(true)
        .interact_text()?;

    controller.send_otp(&digits).await;
    if let AuthPhase::Failed(err) = controller.phase() {
        println!("{} {err}", "Failed:".red().bold());
        return Ok(());
    }
    println!("{}", "Verification code sent".green());

    loop {
        let resend_label = if controller.can_resend() {
            "Resend code".to_string()
        } else {
            format!(
                "Resend code (wait {}s)",
                controller.resend_cooldown().unwrap_or(0)
            )
        };
        let options = vec!["Enter code".to_string(), resend_label, "Back".to_string()];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Verification")
            .items(&options)
            .default(0)
            .interact_on(term)?;

        match selection {
            0 => {
                let code: String = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Verification code")
                    .allow_empty(true)
                    .interact_text()?;
                controller.verify_otp(&code).await;
                report(controller);
                if controller.phase().is_resolved() {
                    break;
                }
            }
            1 => {
                if controller.can_resend() {
                    controller.resend_otp().await;
                    report(controller);
                } else {
                    println!("{}", "Still cooling down".yellow());
                }
            }
            2 => break,
            _ => unreachable!(),
        }
    }
    Ok(())
}

fn pick_role() -> Result<Role> {
    let labels: Vec<&str> = Role::ALL.iter().map(|role| role.as_str()).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Role")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Role::ALL[index])
}

fn show_session(deps: &FlowDeps) {
    let tracker = SessionTracker::subscribe(Arc::clone(&deps.identity), |_| {});
    let state = tracker.current();
    match state.principal() {
        Some(principal) => {
            println!("{} uid={}", "Signed in:".green().bold(), principal.uid);
            if let Some(email) = &principal.email {
                println!("  email: {email}");
            }
            if let Some(phone) = &principal.phone_number {
                println!("  phone: {phone}");
            }
        }
        None => println!("{}", "Signed out".yellow()),
    }
    println!("  protected route: {:?}", guard_protected_route(&state));
}

async fn sign_out(deps: &FlowDeps) {
    match deps.identity.sign_out().await {
        Ok(()) => println!("{}", "Signed out".green()),
        Err(err) => println!("{} {err}", "Sign-out failed:".red().bold()),
    }
}

fn report(controller: &AuthFlowController) {
    match controller.phase() {
        AuthPhase::Resolved(destination) => println!(
            "{} {}",
            "Done - redirected to".green().bold(),
            destination.as_path().bold()
        ),
        AuthPhase::Failed(err) => println!("{} {err}", "Failed:".red().bold()),
        other => println!("phase: {other:?}"),
    }
}
