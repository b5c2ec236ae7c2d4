pub mod announcements;
pub mod auth;
pub mod chamas;
pub mod contributions;
pub mod dashboard;
pub mod health;
pub mod members;
pub mod messages;
pub mod profile;
pub mod transactions;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(health::router()).nest(
        "/api/v1",
        auth::router()
            .merge(profile::router())
            .merge(chamas::router())
            .merge(members::router())
            .merge(contributions::router())
            .merge(transactions::router())
            .merge(announcements::router())
            .merge(messages::router())
            .merge(dashboard::router()),
    )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Auth
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        // Profile
        profile::get_profile,
        profile::update_profile,
        // Chamas
        chamas::list_chamas,
        chamas::create_chama,
        chamas::get_chama,
        chamas::update_chama,
        chamas::join_chama,
        chamas::leave_chama,
        // Members
        members::list_members,
        members::update_member,
        // Contributions
        contributions::list_contributions,
        contributions::add_contribution,
        // Transactions
        transactions::list_transactions,
        transactions::add_transaction,
        // Announcements
        announcements::list_announcements,
        announcements::add_announcement,
        // Messages
        messages::list_messages,
        messages::list_recipients,
        messages::send_message,
        messages::get_message,
        // Dashboard
        dashboard::dashboard,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::auth::tokens::Session,
            crate::models::user::UserResponse,
            crate::models::user::UserRef,
            crate::models::profile::UserProfile,
            crate::models::chama::Chama,
            crate::models::chama::ChamaSummary,
            crate::models::chama::ChamaDetail,
            crate::models::chama::ViewerMembership,
            crate::models::membership::Membership,
            crate::models::membership::MemberEntry,
            crate::models::contribution::Contribution,
            crate::models::contribution::ContributionEntry,
            crate::models::transaction::Transaction,
            crate::models::transaction::TransactionType,
            crate::models::announcement::Announcement,
            crate::models::announcement::AnnouncementEntry,
            crate::models::message::Message,
            crate::models::message::MessageEntry,
            crate::permissions::Role,
            // Route request/response types
            health::HealthResponse,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RefreshRequest,
            profile::ProfileResponse,
            profile::UpdateProfileRequest,
            chamas::CreateChamaRequest,
            chamas::UpdateChamaRequest,
            chamas::JoinStatus,
            chamas::JoinResponse,
            members::UpdateMemberRequest,
            contributions::AddContributionRequest,
            contributions::ContributionList,
            transactions::AddTransactionRequest,
            transactions::TransactionList,
            announcements::AddAnnouncementRequest,
            messages::Mailbox,
            messages::ChamaRef,
            messages::RecipientOptions,
            messages::SendMessageRequest,
            dashboard::Dashboard,
            dashboard::RecentContribution,
            dashboard::MyChama,
            dashboard::GlobalStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Registration and sessions"),
        (name = "Profile", description = "The caller's account"),
        (name = "Chamas", description = "Chama lifecycle"),
        (name = "Members", description = "Chama members"),
        (name = "Contributions", description = "Member contributions"),
        (name = "Transactions", description = "Group ledger"),
        (name = "Announcements", description = "Chama announcements"),
        (name = "Messages", description = "Private messaging"),
        (name = "Dashboard", description = "Activity overview"),
    )
)]
pub struct ApiDoc;
