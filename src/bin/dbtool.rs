use std::io::{BufRead, Write};
use tryon_api::{maintenance, Config};

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  backup   Copy the database file aside");
    eprintln!("  reset    Back up, delete and recreate the database (asks for confirmation)");
    eprintln!("  fix      Strip the legacy 'storage/' prefix from stored paths");
    eprintln!("  clean    Delete sessions whose user or product row is gone");
    eprintln!("  stats    Print row counts and latest activity");
    eprintln!("  verify   Report stored paths with no file on disk");
}

fn confirm(question: &str) -> bool {
    print!("{question} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn report_backup(backup: Option<std::path::PathBuf>) {
    match backup {
        Some(path) => println!("Backup written to {}", path.display()),
        None => println!("No database file yet, nothing to back up"),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args();
    let bin_name = args.next().unwrap_or_else(|| "dbtool".to_string());
    let command = match (args.next(), args.next()) {
        (Some(command), None) => command,
        _ => {
            print_usage(&bin_name);
            std::process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    tryon_api::init_tracing(&config.logging.level, config.logging.json_format);

    let outcome = match command.as_str() {
        "backup" => maintenance::backup_database(&config).map(report_backup),
        "reset" => {
            if !confirm(&format!("Delete and recreate '{}'?", config.database.path)) {
                println!("Aborted");
                return;
            }
            maintenance::reset_database(&config).await.map(|backup| {
                report_backup(backup);
                println!("Database reset to an empty schema");
            })
        }
        "fix" => maintenance::fix_path_prefixes(&config).await.map(|(backup, report)| {
            report_backup(backup);
            println!(
                "Rewrote {} product row(s) and {} session row(s)",
                report.products_updated, report.sessions_updated
            );
        }),
        "clean" => maintenance::clean_orphans(&config).await.map(|(backup, pruned)| {
            report_backup(backup);
            if pruned.is_empty() {
                println!("No orphaned sessions found");
            } else {
                for orphan in &pruned {
                    println!(
                        "Deleted session {} (user_id={}, product_id={})",
                        orphan.id, orphan.user_id, orphan.product_id
                    );
                }
                println!("Deleted {} orphaned session(s)", pruned.len());
            }
        }),
        "stats" => maintenance::stats(&config).await.map(|stats| {
            println!("Users:              {}", stats.users);
            println!("Products:           {}", stats.products);
            println!("Try-on sessions:    {}", stats.sessions);
            println!("  completed:        {}", stats.completed_sessions);
            println!("  without output:   {}", stats.failed_sessions);
            if let Some(at) = stats.last_user_at {
                println!("Last user created:  {at}");
            }
            if let Some(at) = stats.last_product_at {
                println!("Last product added: {at}");
            }
            if let Some(at) = stats.last_session_at {
                println!("Last session:       {at}");
            }
        }),
        "verify" => maintenance::verify_files(&config).await.map(|report| {
            println!(
                "Checked {} product(s) and {} session(s)",
                report.products_checked, report.sessions_checked
            );
            for (id, name, filepath) in &report.missing_product_files {
                println!("Missing product file: id={id} name={name} path={filepath}");
            }
            for (id, path) in &report.missing_session_files {
                println!("Missing session file: session={id} path={path}");
            }
            if report.missing_product_files.is_empty() && report.missing_session_files.is_empty() {
                println!("All stored paths resolve to files on disk");
            }
        }),
        _ => {
            print_usage(&bin_name);
            std::process::exit(2);
        }
    };

    if let Err(err) = outcome {
        eprintln!("{command} failed: {err}");
        std::process::exit(1);
    }
}
