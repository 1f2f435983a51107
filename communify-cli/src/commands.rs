//! Subcommand implementations
//!
//! Each command writes its user-facing output to `out` and returns an error
//! only for failures; every join outcome is a success.

use anyhow::{Context, Result};
use communify_core::core_community::{
    my_communities, open_communities, Community, CommunityDirectory, CommunityId, CommunityType,
    DirectoryError, InvitationCode, JoinRequest, JoinService, Timestamp, UserId,
};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Demo data: (id, name, type, invitation code, creator)
const DEMO_COMMUNITIES: &[(&str, &str, CommunityType, Option<&str>, &str)] = &[
    ("demo-hike", "Friday Hike", CommunityType::Closed, Some("HIKE24"), "alice@x.com"),
    ("demo-books", "Book Club", CommunityType::Closed, Some("BOOKS1"), "bob@x.com"),
    ("demo-picnic", "Park Picnic", CommunityType::Open, None, "alice@x.com"),
    ("demo-run", "Morning Run", CommunityType::Open, None, "carol@x.com"),
];

fn demo_communities() -> Vec<Community> {
    let now = Timestamp::now().as_millis();
    DEMO_COMMUNITIES
        .iter()
        .enumerate()
        .map(|(i, (id, name, kind, code, creator))| {
            let mut community = Community::new(*name, UserId::from(*creator), *kind);
            community.id = CommunityId::from(*id);
            community.invitation_code = code.map(str::to_string);
            community.created_at = Timestamp::from_millis(now + i as u64);
            community
        })
        .collect()
}

/// Insert demo Communities, or those listed in a JSON file
pub async fn seed(
    directory: &dyn CommunityDirectory,
    file: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let communities = match file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read seed file {}", path.display()))?;
            serde_json::from_str::<Vec<Community>>(&contents)
                .with_context(|| format!("Failed to parse seed file {}", path.display()))?
        }
        None => demo_communities(),
    };

    let mut inserted = 0;
    for community in &communities {
        match directory.insert(community).await {
            Ok(()) => inserted += 1,
            Err(DirectoryError::AlreadyExists(id)) => {
                warn!(community = %id, "Skipping existing community");
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(inserted, total = communities.len(), "Seeded directory");
    writeln!(out, "Seeded {} of {} communities", inserted, communities.len())?;
    Ok(())
}

/// Create a Community and print its id and invitation code
pub async fn create(
    directory: &dyn CommunityDirectory,
    name: String,
    created_by: String,
    open: bool,
    code: Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let kind = if open {
        CommunityType::Open
    } else {
        CommunityType::Closed
    };
    let mut community = Community::new(name, UserId::new(created_by), kind);

    if let Some(raw) = code {
        let code = InvitationCode::parse(&raw).context("Invitation code must not be blank")?;
        community.invitation_code = Some(code.to_string());
    }

    directory.insert(&community).await?;
    info!(community = %community.id, kind = %kind, "Created community");

    writeln!(out, "{}\t{}", community.id, community.name)?;
    if let Some(code) = &community.invitation_code {
        writeln!(out, "Invitation code: {}", code)?;
    }
    Ok(())
}

/// Join with an invitation code and print the outcome message
pub async fn join(
    service: &JoinService,
    user: String,
    raw_code: &str,
    out: &mut impl Write,
) -> Result<()> {
    // A blank code submits nothing
    let Some(request) = JoinRequest::new(raw_code, UserId::new(user)) else {
        writeln!(out, "Please enter an invitation code")?;
        return Ok(());
    };

    let outcome = service.submit(&request).await?;
    writeln!(out, "{}", outcome.message())?;
    Ok(())
}

fn print_communities(communities: &[Community], out: &mut impl Write) -> Result<()> {
    if communities.is_empty() {
        writeln!(out, "No communities")?;
    }
    for community in communities {
        writeln!(
            out,
            "{}\t{}\t{} members\t{} attending",
            community.id,
            community.name,
            community.members.len(),
            community.attendee_count()
        )?;
    }
    Ok(())
}

/// List the newest open Communities
pub async fn open(directory: &dyn CommunityDirectory, limit: usize, out: &mut impl Write) -> Result<()> {
    let communities = open_communities(directory, limit).await?;
    print_communities(&communities, out)
}

/// List the closed Communities a user created or joined
pub async fn mine(directory: &dyn CommunityDirectory, user: String, out: &mut impl Write) -> Result<()> {
    let communities = my_communities(directory, &UserId::new(user)).await?;
    print_communities(&communities, out)
}
