//! Member registration, authentication and account removal.

use crate::crypto;
use crate::errors::BookmarkError;
use crate::models::{Member, NewMember, RegisterMemberRequest};
use crate::observability::metrics::record_login_attempt;
use crate::repositories::MemberRepository;
use common::secret::{ExposeSecret, SecretString};
use tracing::instrument;

/// Maximum email length in bytes (RFC 5321 path limit).
pub const MAX_EMAIL_BYTES: usize = 254;

/// Maximum nickname length in characters.
pub const MAX_NICKNAME_CHARS: usize = 50;

/// Minimum password length in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Characters of which a password must contain at least one.
pub const PASSWORD_SPECIAL_CHARS: &str = "@#$%^&+=";

/// Structural email check: one `@`, a dot-atom local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_BYTES {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    local_ok && domain_ok
}

/// 1 to 50 of `[A-Za-z0-9_ ]`, at least one alphanumeric.
pub fn is_valid_nickname(nickname: &str) -> bool {
    let length = nickname.chars().count();

    (1..=MAX_NICKNAME_CHARS).contains(&length)
        && nickname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
        && nickname.chars().any(|c| c.is_ascii_alphanumeric())
}

/// At least 8 characters with a digit, a lowercase letter, an uppercase
/// letter and one of `@#$%^&+=`, and no whitespace.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c))
        && !password.chars().any(char::is_whitespace)
}

/// Validate and create a member.
///
/// Checks run in order: email format, email availability, nickname, password.
///
/// # Errors
///
/// - `BookmarkError::Validation` - invalid email, nickname or password
/// - `BookmarkError::Conflict` - email already registered
#[instrument(skip_all)]
pub async fn register(
    members: &dyn MemberRepository,
    request: RegisterMemberRequest,
    bcrypt_cost: u32,
) -> Result<Member, BookmarkError> {
    let email = request.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(BookmarkError::Validation(
            "Email is required and must be a valid email address".to_string(),
        ));
    }

    if members.find_member_by_email(&email).await?.is_some() {
        return Err(BookmarkError::Conflict(
            "Email is already registered".to_string(),
        ));
    }

    if !is_valid_nickname(&request.nickname) {
        return Err(BookmarkError::Validation(
            "Nickname is required and must be at most 50 letters, digits, underscores or spaces"
                .to_string(),
        ));
    }

    let password = request
        .password
        .filter(|p| is_strong_password(p.expose_secret()))
        .ok_or_else(|| {
            BookmarkError::Validation(
                "Password must be at least 8 characters with upper and lower case letters, a digit and one of @#$%^&+="
                    .to_string(),
            )
        })?;

    let password_hash = crypto::hash_password(&password, bcrypt_cost)?;

    let member = members
        .create_member(NewMember {
            email,
            nickname: request.nickname,
            password_hash,
        })
        .await?;

    tracing::info!(target: "bookmark.members", member_id = member.member_id, "Member registered");
    Ok(member)
}

/// Check a member's credentials.
///
/// # Errors
///
/// - `BookmarkError::Validation` - blank email or password
/// - `BookmarkError::MemberNotFound` - no member with that email
/// - `BookmarkError::InvalidCredentials` - wrong password
#[instrument(skip_all)]
pub async fn authenticate(
    members: &dyn MemberRepository,
    email: &str,
    password: Option<&SecretString>,
) -> Result<Member, BookmarkError> {
    let email = email.trim();
    if email.is_empty() {
        record_login_attempt("missing_credentials");
        return Err(BookmarkError::Validation("Email is required".to_string()));
    }

    let Some(member) = members.find_member_by_email(email).await? else {
        record_login_attempt("unknown_member");
        return Err(BookmarkError::MemberNotFound);
    };

    let Some(password) = password.filter(|p| !p.expose_secret().is_empty()) else {
        record_login_attempt("missing_credentials");
        return Err(BookmarkError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    if !crypto::verify_password(password, &member.password_hash)? {
        record_login_attempt("invalid_credentials");
        tracing::debug!(target: "bookmark.members", "Login rejected: wrong password");
        return Err(BookmarkError::InvalidCredentials);
    }

    record_login_attempt("success");
    tracing::info!(target: "bookmark.members", member_id = member.member_id, "Member logged in");
    Ok(member)
}

/// Fetch the authenticated member.
///
/// # Errors
///
/// Returns `BookmarkError::MemberNotFound` if the member no longer exists.
pub async fn get(members: &dyn MemberRepository, member_id: i64) -> Result<Member, BookmarkError> {
    members
        .find_member_by_id(member_id)
        .await?
        .ok_or(BookmarkError::MemberNotFound)
}

/// Delete the authenticated member and everything they own.
///
/// # Errors
///
/// Returns `BookmarkError::Gone` if the member was already deleted.
#[instrument(skip_all)]
pub async fn remove(members: &dyn MemberRepository, member_id: i64) -> Result<(), BookmarkError> {
    if !members.delete_member(member_id).await? {
        return Err(BookmarkError::Gone("Member has already been deleted".to_string()));
    }

    tracing::info!(target: "bookmark.members", member_id = member_id, "Member deleted");
    Ok(())
}
