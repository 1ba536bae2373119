//! Terminal rendering for conversation messages

use camplab_core::format::{self, parse_markup};
use camplab_core::{Message, RiskLevel, Role, SolutionProgress};
use crossterm::style::Stylize;

/// Print one message with markup interpreted
pub fn print_message(message: &Message) {
    let label = match message.role {
        Role::User => "you".cyan().bold(),
        Role::Assistant => "assistant".green().bold(),
    };
    println!("{} {}", label, format!("#{}", message.id).dark_grey());

    for line in parse_markup(&message.content) {
        let mut rendered = String::new();
        if line.bullet {
            rendered.push_str("  • ");
        }
        for span in &line.spans {
            if span.bold {
                rendered.push_str(&span.text.bold().to_string());
            } else {
                rendered.push_str(span.text);
            }
        }
        println!("{}", rendered);
    }

    if let Some(analysis) = &message.analysis {
        let risk = analysis.risk_level.as_str();
        let risk = match analysis.risk_level {
            RiskLevel::Low => risk.green(),
            RiskLevel::Medium => risk.yellow(),
            RiskLevel::High => risk.red(),
        };
        println!(
            "{}",
            format!(
                "risk: {} | confidence: {}% | {}",
                risk, analysis.confidence, analysis.response_kind
            )
            .dark_grey()
        );
    }

    if let Some(recommendations) = &message.recommendations {
        if !recommendations.is_empty() {
            println!("{}", "Recommendations:".bold());
            for item in recommendations {
                println!("  - {}", item);
            }
        }
    }

    if let Some(follow_up) = &message.follow_up {
        println!("{} {}", "Next:".bold(), follow_up.as_str().italic());
    }

    if let Some(progress) = &message.solution_progress {
        print_progress(progress);
    }
    println!();
}

/// Phase, progress bar and artifacts on one or two lines
pub fn print_progress(progress: &SolutionProgress) {
    println!(
        "{} {}",
        progress.phase.as_str().magenta(),
        format::progress_bar(progress.progress, 20)
    );
    if !progress.artifacts.is_empty() {
        let artifacts: Vec<&str> = progress.artifacts.iter().map(String::as_str).collect();
        println!("{}", format!("artifacts: {}", artifacts.join(", ")).dark_grey());
    }
}
