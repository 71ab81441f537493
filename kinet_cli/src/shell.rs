use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};
use kinet_frontend::feed::FeedKind;
use kinet_frontend::models::Post;

use crate::commands::{self, Command, Context};
use crate::render;

#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Load and print the next page of the recent feed
    More,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
    #[command(flatten)]
    Run(Command),
}

enum LoopAction {
    Continue,
    Exit,
}

/// Reads commands from stdin until EOF or `exit`, keeping one client alive
/// so loaded feeds survive between commands.
pub fn run_shell(ctx: &mut Context) -> Result<()> {
    println!("Kinet shell connected to {}. Type 'help' for commands.", ctx.config.api_url);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("kinet> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!("Exiting");
            break;
        };
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens = match shell_words::split(trimmed) {
            Ok(tokens) if !tokens.is_empty() => tokens,
            Ok(_) => continue,
            Err(err) => {
                println!("Unable to parse command: {err}");
                continue;
            }
        };

        // Apply anything that finished while we sat at the prompt.
        ctx.app.process_messages();
        match handle_line(ctx, &tokens) {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Exit) => break,
            Err(err) => println!("Error: {err:#}"),
        }
    }
    Ok(())
}

fn handle_line(ctx: &mut Context, tokens: &[String]) -> Result<LoopAction> {
    let parsed = match ShellLine::try_parse_from(tokens) {
        Ok(parsed) => parsed,
        Err(err) => {
            // Help and usage errors are both printed, never fatal.
            let _ = err.print();
            return Ok(LoopAction::Continue);
        }
    };
    match parsed.command {
        ShellCommand::Exit => return Ok(LoopAction::Exit),
        ShellCommand::More => show_more(ctx)?,
        ShellCommand::Run(Command::Feed { pages })
            if ctx.app.recent().is_loaded() && pages == 1 =>
        {
            // Already loaded; show what we have without resetting paging.
            println!("{}", render::posts(ctx.app.recent().posts(), ctx.app.session()));
        }
        ShellCommand::Run(command) => commands::run(ctx, command)?,
    }
    Ok(LoopAction::Continue)
}

fn show_more(ctx: &mut Context) -> Result<()> {
    if !ctx.app.recent().is_loaded() {
        return commands::run(ctx, Command::Feed { pages: 1 });
    }
    let before = ctx.app.recent().posts().len();
    match ctx.more()? {
        None if ctx.app.store(&FeedKind::Recent).is_some_and(|s| s.is_exhausted()) => {
            println!("No more posts.");
        }
        None => println!("Still loading; try again."),
        Some(0) => println!("No new posts on that page."),
        Some(_) => {
            let session = ctx.app.session();
            for post in added_since(ctx.app.recent().posts(), before) {
                println!("{}\n", render::post(post, session));
            }
        }
    }
    Ok(())
}

/// Posts past the first `before`. A refresh that landed meanwhile can leave
/// fewer posts than that, in which case the whole feed is new to the reader.
fn added_since(posts: &[Post], before: usize) -> &[Post] {
    posts.get(before..).unwrap_or(posts)
}
