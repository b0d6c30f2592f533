//! Trip roster command-line client
//!
//! Talks to a running trip-roster over HTTP. Identity is sent the same way
//! the authenticating proxy would send it, so point it at the proxy in
//! production or straight at the service for local use.
//!
//! Usage:
//!   cargo run --bin rosterctl -- list
//!   cargo run --bin rosterctl -- --email ann@example.com --name Ann register SkiTrip_Mar2025
//!   cargo run --bin rosterctl -- --email ann@example.com check-in SkiTrip_Mar2025

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use trip_roster::domain::{Email, Registrant, Trip, TripSummary};
use trip_roster::services::CallerView;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "rosterctl")]
#[command(about = "Trip roster client - list trips, register, check in, remove")]
struct Args {
    /// Base URL of the roster service
    #[arg(long, default_value = "http://127.0.0.1:8080", global = true)]
    server: String,

    /// Email to act as
    #[arg(long, global = true)]
    email: Option<String>,

    /// Display name to register with
    #[arg(long, global = true)]
    name: Option<String>,

    /// Header carrying the email
    #[arg(long, default_value = "X-Auth-Request-Email", global = true)]
    email_header: String,

    /// Header carrying the display name
    #[arg(long, default_value = "X-Auth-Request-User", global = true)]
    name_header: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every trip
    List,
    /// Show a trip's bus list and waitlist
    Show { trip: String },
    /// Show your own registration status for a trip
    Status { trip: String },
    /// Register for a trip
    Register { trip: String },
    /// Check in (only on the day two days before the trip)
    CheckIn {
        trip: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove your registration
    Remove {
        trip: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

// ============================================================================
// HTTP client
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

struct Client {
    http: reqwest::Client,
    base: String,
    args_email: Option<String>,
    args_name: Option<String>,
    email_header: String,
    name_header: String,
}

impl Client {
    fn new(args: &Args) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: args.server.trim_end_matches('/').to_string(),
            args_email: args.email.clone(),
            args_name: args.name.clone(),
            email_header: args.email_header.clone(),
            name_header: args.name_header.clone(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str, as_caller: bool) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base, path);
        let mut request = self.http.request(method, &url);

        if as_caller {
            let Some(email) = &self.args_email else {
                bail!("--email is required for this command");
            };
            request = request.header(self.email_header.as_str(), email.as_str());
            if let Some(name) = &self.args_name {
                request = request.header(self.name_header.as_str(), name.as_str());
            }
        }

        let response = request.send().await.with_context(|| format!("Request to {url} failed"))?;
        let status = response.status();
        let bytes = response.bytes().await.context("Failed to read response body")?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).context("Unexpected response from server");
        }

        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => bail!("{} ({})", body.error, body.kind),
            Err(_) if status == StatusCode::NOT_FOUND => bail!("Not found: {url}"),
            Err(_) => bail!("Server returned {status}"),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_list(title: &str, entries: &[Registrant]) {
    println!("{title} ({})", entries.len());
    if entries.is_empty() {
        println!("  (none)");
    }
    for (i, r) in entries.iter().enumerate() {
        let mark = if r.check_in.is_checked_in() { " [checked in]" } else { "" };
        println!("  {:>3}. {} <{}>{}", i + 1, r.name, r.email, mark);
    }
}

fn print_trip(trip: &Trip) {
    println!(
        "{}  {}  {}/{} seats taken, {} open",
        trip.name(),
        trip.date(),
        trip.bus_list().len(),
        trip.bus_capacity(),
        trip.open_seats()
    );
    print_list("Bus", trip.bus_list());
    print_list("Waitlist", trip.wait_list());
}

fn print_summaries(trips: &[TripSummary]) {
    if trips.is_empty() {
        println!("No trips");
        return;
    }
    println!("{:<24} {:<10} {:>9} {:>9}", "TRIP", "DATE", "SEATS", "WAITLIST");
    for t in trips {
        println!(
            "{:<24} {:<10} {:>9} {:>9}",
            t.name,
            t.trip_date.to_string(),
            format!("{}/{}", t.seats_taken, t.bus_capacity),
            t.waitlist_len
        );
    }
}

fn print_view(view: &CallerView) {
    if view.registered {
        println!("{}", view.status_text);
    } else {
        println!("You are not registered for {}.", view.trip.name());
    }
    match view.check_in_date {
        Some(date) if view.can_check_in => println!("Check-in is open today ({date})."),
        Some(date) => println!("Check-in opens on {date} only."),
        None => {}
    }
}

/// Caller's status line read off the snapshot a mutation returned
fn status_line(trip: &Trip, email: &str) -> String {
    let text = trip.status(&Email::from(email)).text();
    if text.is_empty() {
        format!("You are not registered for {}.", trip.name())
    } else {
        text
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = Client::new(&args);

    match &args.command {
        Command::List => {
            let trips: Vec<TripSummary> = client.call(Method::GET, "/trips", false).await?;
            print_summaries(&trips);
        }
        Command::Show { trip } => {
            let trip: Trip = client.call(Method::GET, &format!("/trips/{trip}"), false).await?;
            print_trip(&trip);
        }
        Command::Status { trip } => {
            let view: CallerView = client.call(Method::GET, &format!("/trips/{trip}/me"), true).await?;
            print_view(&view);
        }
        Command::Register { trip } => {
            let trip: Trip = client.call(Method::POST, &format!("/trips/{trip}/registration"), true).await?;
            println!("Registered successfully!");
            println!("{}", status_line(&trip, args.email.as_deref().unwrap_or_default()));
        }
        Command::CheckIn { trip, yes } => {
            if !yes && !confirm("Are you sure you want to check in?")? {
                println!("Cancelled");
                return Ok(());
            }
            let _: Trip = client.call(Method::POST, &format!("/trips/{trip}/check-in"), true).await?;
            println!("Checked in successfully!");
        }
        Command::Remove { trip, yes } => {
            if !yes && !confirm("Are you sure you want to remove your registration?")? {
                println!("Cancelled");
                return Ok(());
            }
            let _: Trip = client.call(Method::DELETE, &format!("/trips/{trip}/registration"), true).await?;
            println!("Removed successfully!");
        }
    }

    Ok(())
}
