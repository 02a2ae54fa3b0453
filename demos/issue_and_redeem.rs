//! Issue-and-redeem walkthrough.
//!
//! Seeds the in-memory store with one paid resource and an individual
//! grant, then walks a download through the full gate: token issuance,
//! followed by redemption of the minted token.
//!
//! # Running
//!
//! ```bash
//! export PAYWARDEN_SIGNING_SECRET="demo-signing-secret-0123456789abcdef"
//! cargo run --example issue_and_redeem
//! ```

use paywarden::{
    DownloadGate, EntitlementStore, FileId, FileRecord, FixedWindowLimiter, GateConfig,
    MemoryStore, PaywardenError, Resource, ResourceId, Role, User, UserId,
};
use std::sync::Arc;

const ALICE: UserId = UserId(7);
const FIELD_GUIDE: ResourceId = ResourceId(3);
const FIELD_GUIDE_PDF: FileId = FileId(21);

fn main() {
    // Signing secret comes from the environment; the gate refuses to start
    // without one.
    let config = match GateConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryStore::new());
    if let Err(e) = seed(store.as_ref()) {
        eprintln!("Seeding error: {}", e);
        std::process::exit(1);
    }

    let gate = match DownloadGate::new(
        config,
        Arc::new(FixedWindowLimiter::new()),
        Arc::clone(&store) as Arc<dyn EntitlementStore>,
    ) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Gate construction error: {}", e);
            std::process::exit(1);
        }
    };

    // Issue a token for the granted user
    let issued = match gate.issue(Some(ALICE), FIELD_GUIDE, FIELD_GUIDE_PDF) {
        Ok(issued) => {
            println!("✓ Token issued for {}", issued.file_name);
            println!("  Redeem at: {}", issued.download_url);
            println!("  Expires:   {}", issued.expires_at);
            issued
        }
        Err(e) => {
            match &e {
                PaywardenError::Forbidden => {
                    eprintln!("Caller is not entitled to this resource");
                }
                PaywardenError::NotFound => {
                    eprintln!("No such file under this resource");
                }
                PaywardenError::RateLimited {
                    retry_after_seconds,
                } => {
                    eprintln!("Rate limited - retry in {}s", retry_after_seconds);
                }
                _ => {
                    eprintln!("Issuance error: {}", e);
                }
            }
            std::process::exit(1);
        }
    };

    // Redeem it, the way the HTTP layer would after extracting the `token`
    // query parameter
    let token = issued
        .download_url
        .split("token=")
        .nth(1)
        .unwrap_or_default();

    match gate.redeem(token) {
        Ok(redeemed) => {
            println!("✓ Token redeemed");
            println!("  Redirect to:   {}", redeemed.location);
            println!("  Cache-Control: {}", redeemed.cache_control);
        }
        Err(e) => {
            eprintln!("Redemption failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn seed(store: &MemoryStore) -> Result<(), PaywardenError> {
    store.insert_user(User {
        id: ALICE,
        role: Role::Plain,
        is_admin: false,
    })?;
    store.insert_resource(Resource {
        id: FIELD_GUIDE,
        is_free: false,
    })?;
    store.insert_file(FileRecord {
        id: FIELD_GUIDE_PDF,
        resource_id: FIELD_GUIDE,
        name: "field-guide.pdf".to_string(),
        location: "s3://content/field-guide.pdf".to_string(),
    })?;

    // The resource is paid and the user has no subscription: access comes
    // from a permanent individual grant
    store.grant_access(ALICE, FIELD_GUIDE, None)?;
    Ok(())
}
