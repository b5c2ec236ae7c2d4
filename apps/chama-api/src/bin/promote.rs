//! Grant the global `admin` profile role to a user.
//!
//! Usage:
//!   cargo run -p chama-api --bin chama-promote -- <username>
//!   cargo run -p chama-api --bin chama-promote -- <username> --revoke
//!
//! Global admins see system-wide figures on their dashboard. Chama-level
//! roles are unaffected.

use chama_api::db::schema::{user_profiles, users};
use chama_api::permissions::Role;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let revoke = args.iter().any(|a| a == "--revoke");
    let Some(username) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: chama-promote <username> [--revoke]");
        return ExitCode::FAILURE;
    };

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL env var is required");
    let mut conn =
        PgConnection::establish(&database_url).expect("failed to connect to database");

    let user_id: Option<String> = users::table
        .filter(users::username.eq(username))
        .select(users::id)
        .first(&mut conn)
        .optional()
        .expect("failed to look up user");

    let Some(user_id) = user_id else {
        eprintln!("No user named {username:?}");
        return ExitCode::FAILURE;
    };

    let role = if revoke { Role::Member } else { Role::Admin };
    diesel::update(user_profiles::table.find(&user_id))
        .set((
            user_profiles::role.eq(role.as_str()),
            user_profiles::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .expect("failed to update profile");

    println!("{username} ({user_id}) now has the global {role} role.");
    ExitCode::SUCCESS
}
