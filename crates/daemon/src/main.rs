// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::OpContext, Daemon, Health, Init, Link, Render, Rewrite, UploadTarget, Version};

command_enum! {
    Daemon,
    Health,
    Init,
    Link,
    Render,
    Rewrite,
    UploadTarget,
    Version,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let ctx = match OpContext::new(args.remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.run(&ctx).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
