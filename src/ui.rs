// UI layer: first-run registration and the interactive menu, built on
// `dialoguer` prompts. Feed rendering and selection handling are plain
// functions so they can be tested without a terminal.

use crate::api::{ApiClient, MoltbookApi};
use crate::logging::ProgressGuard;
use crate::models::{ActionResponse, Post, VoteDirection};
use anyhow::{anyhow, Result};
use crossterm::style::Stylize;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// How many feed entries are listed at once.
pub const FEED_PAGE: usize = 10;

const MENU_ITEMS: [&str; 6] = [
    "1. 📱 View Feed & Reply",
    "2. ✍️  New Post",
    "3. 🔍 Semantic Search",
    "4. 🏗️  Create Submolt",
    "5. ➕ Join Submolt (by ID)",
    "6. 🚪 Exit",
];

/// What to do with a post picked from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAction {
    Reply(String),
    Upvote,
}

/// Spinner that stays on screen until the returned guard is dropped.
fn spinner(msg: &'static str) -> Result<ProgressGuard> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(ProgressGuard::new(spinner))
}

/// Prompt for a name and description and register a new agent. Returns
/// whether the client now holds credentials; failures are printed.
pub fn first_run(api: &mut ApiClient) -> Result<bool> {
    println!("Welcome to Moltbook! No credentials found.");
    let name: String = Input::new().with_prompt("Enter Agent Name").interact_text()?;
    let description: String = Input::new()
        .with_prompt("Enter Agent Description")
        .interact_text()?;

    let spinner = spinner("Registering...")?;
    let outcome = api.register(&name, &description);
    drop(spinner);

    match outcome {
        Ok(registration) => {
            println!("✅ Registration saved to {}!", api.store().path().display());
            let identity = &registration.identity;
            println!(
                "🦞 Registered as {} (id {})",
                identity.display_name,
                identity.id.as_deref().unwrap_or("unknown")
            );
            if let Some(url) = &registration.claim_url {
                println!("🔗 CLAIM URL: {}", url);
            }
            if let Some(code) = &registration.verification_code {
                println!("🔑 VERIFICATION CODE: {}", code);
            }
            Ok(true)
        }
        Err(e) => {
            println!("❌ Registration failed: {}", e);
            if e.is_transport() {
                println!("Check your connection or MOLTBOOK_BASE_URL and try again.");
            }
            Ok(false)
        }
    }
}

/// Main interactive menu. Runs until the user picks "Exit".
pub fn main_menu<A: MoltbookApi>(api: &A, display_name: &str) -> Result<()> {
    loop {
        println!(
            "\n══════════════════════════════\n  {}\n══════════════════════════════",
            format!("MOLTBOOK: {}", display_name).bold().cyan()
        );
        let selection = Select::new()
            .with_prompt("Select action")
            .items(&MENU_ITEMS)
            .default(0)
            .interact()?;
        match selection {
            0 => handle_feed(api)?,
            1 => {
                let content: String = Input::new()
                    .with_prompt("What's on your mind?")
                    .interact_text()?;
                report(api.post(&content), "✅ Post sent!");
            }
            2 => {
                let query: String = Input::new().with_prompt("Search meaning").interact_text()?;
                let results = api.semantic_search(&query);
                if results.posts.is_empty() {
                    println!("No matches.");
                }
                for post in &results.posts {
                    println!("- {}", post.content());
                }
            }
            3 => {
                let name: String = Input::new().with_prompt("Submolt Name").interact_text()?;
                let description: String =
                    Input::new().with_prompt("Description").interact_text()?;
                match api.create_submolt(&name, &description) {
                    Ok(resp) => match resp.action.server_error() {
                        Some(reason) => println!("⚠️  Server said: {}", reason),
                        None => println!("✅ Created! ID: {}", resp.id().unwrap_or("unknown")),
                    },
                    Err(e) => println!("❌ {}", e),
                }
            }
            4 => {
                let id: String = Input::new()
                    .with_prompt("Enter Submolt ID")
                    .interact_text()?;
                report(api.subscribe(&id), "✅ Subscribed!");
            }
            5 => break,
            _ => {}
        }
    }
    Ok(())
}

fn handle_feed<A: MoltbookApi>(api: &A) -> Result<()> {
    let spinner = spinner("Loading feed...")?;
    let posts = api.get_feed();
    drop(spinner);

    if posts.is_empty() {
        println!("Feed is empty. Ensure your agent is 'claimed'.");
        return Ok(());
    }
    for line in feed_lines(&posts) {
        println!("{}", line);
    }

    let sel: String = Input::new()
        .with_prompt("Enter # to reply/upvote, or 'b' for back")
        .interact_text()?;
    let Some(index) = parse_selection(&sel, posts.len().min(FEED_PAGE)) else {
        return Ok(());
    };

    let choice: String = Input::new().with_prompt("(r)eply or (v)ote?").interact_text()?;
    let action = match choice.trim().to_lowercase().as_str() {
        "r" => PostAction::Reply(Input::new().with_prompt("Message").interact_text()?),
        "v" => PostAction::Upvote,
        _ => return Ok(()),
    };
    let done = match action {
        PostAction::Reply(_) => "✅ Reply sent!",
        PostAction::Upvote => "✅ Upvoted!",
    };
    report(apply_post_action(api, &posts[index], action), done);
    Ok(())
}

/// Numbered `N. [author]: content` lines for the first page of posts.
pub fn feed_lines(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .take(FEED_PAGE)
        .enumerate()
        .map(|(i, p)| format!("{}. [{}]: {}", i + 1, p.author_name(), p.content()))
        .collect()
}

/// Turn a 1-based menu entry into an index, rejecting anything out of range.
pub fn parse_selection(input: &str, len: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Reply to or upvote `post`.
pub fn apply_post_action<A: MoltbookApi>(
    api: &A,
    post: &Post,
    action: PostAction,
) -> Result<ActionResponse> {
    let id = post
        .id
        .as_deref()
        .ok_or_else(|| anyhow!("post has no id"))?;
    let resp = match action {
        PostAction::Reply(message) => api.comment(id, &message)?,
        PostAction::Upvote => api.vote(id, VoteDirection::Up)?,
    };
    Ok(resp)
}

/// Print the result of a write call without ending the session.
fn report<E: std::fmt::Display>(outcome: std::result::Result<ActionResponse, E>, done: &str) {
    match outcome {
        Ok(resp) => match resp.server_error() {
            Some(reason) => println!("⚠️  Server said: {}", reason),
            None => println!("{}", done),
        },
        Err(e) => println!("❌ {}", e),
    }
}
