use clap::{Arg, Command};
use log::LevelFilter;
use phishscore::engine::rules;
use phishscore::evaluation::{self, EvaluationReport};
use phishscore::{EngineConfig, Message, RiskEngine, RiskLabel};
use std::process;

fn main() {
    let matches = Command::new("phishscore")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rule-based phishing risk scoring engine")
        .long_about(
            "Phishscore - explainable phishing triage for email messages:\n\
             • Weighted keyword detection with positional boosts\n\
             • URL heuristics (scheme, shorteners, IP literals, suspicious TLDs)\n\
             • Typosquatting detection against known brand domains\n\
             • Batch evaluation with accuracy and per-rule trigger metrics",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phishscore.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and reference lists")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("message")
                .long("message")
                .value_name("FILE")
                .help("Score a single message (JSON file) and print the assessment")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("dataset")
                .long("dataset")
                .value_name("FILE")
                .help("Evaluate a labeled JSONL dataset and print classification metrics")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging with per-rule detail")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logger based on verbose flag
    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config_path = matches.get_one::<String>("config").unwrap();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        println!();
        println!("Keywords: {}", config.reference.keywords.len());
        println!("Suspicious TLDs: {}", config.reference.suspicious_tlds.len());
        println!("URL shorteners: {}", config.reference.shorteners.len());
        println!("Legitimate domains: {}", config.reference.legit_domains.len());
        println!(
            "Keyword mode: {:?}, classification threshold: {}",
            config.scoring.keyword_mode, config.scoring.classification_threshold
        );
        match config.build_engine() {
            Ok(_) => println!("✅ Configuration validated"),
            Err(e) => {
                println!("❌ Configuration validation failed:");
                println!("Error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let engine = match config.build_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error building scoring engine: {e}");
            process::exit(1);
        }
    };

    if let Some(message_file) = matches.get_one::<String>("message") {
        score_message_file(&engine, message_file);
        return;
    }

    if let Some(dataset_file) = matches.get_one::<String>("dataset") {
        evaluate_dataset_file(&engine, dataset_file);
        return;
    }

    println!("Nothing to score. Use --message <FILE> or --dataset <FILE> (see --help).");
}

fn load_config(path: &str) -> anyhow::Result<EngineConfig> {
    if std::path::Path::new(path).exists() {
        EngineConfig::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(EngineConfig::default())
    }
}

fn generate_default_config(path: &str) {
    let config = EngineConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn score_message_file(engine: &RiskEngine, message_file: &str) {
    println!("🧪 Scoring message file: {message_file}");
    println!();

    let content = match std::fs::read_to_string(message_file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("❌ Error reading message file: {e}");
            process::exit(1);
        }
    };

    let message: Message = match serde_json::from_str(&content) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("❌ Error parsing message file: {e}");
            process::exit(1);
        }
    };

    println!("📧 Message Details:");
    println!("   Sender domain: {}", message.sender_domain);
    println!("   Subject: {}", message.subject);
    println!("   URLs: {}", message.urls.len());
    println!();

    let assessment = engine.assess(&message);

    match assessment.label {
        RiskLabel::Phishing => println!(
            "🚨 Result: PHISHING (score {:.2})",
            assessment.total_score
        ),
        RiskLabel::Ham => println!("✅ Result: HAM (score {:.2})", assessment.total_score),
    }

    println!("   Rule breakdown:");
    for rule in rules::ALL {
        let points = assessment
            .per_rule_points
            .get(*rule)
            .copied()
            .unwrap_or(0);
        println!("     {rule:<16} {points:>3}");
    }

    if assessment.keyword_hits.len() > 1 {
        println!("   Keyword hits:");
        for hit in assessment.keyword_hits.iter().skip(1) {
            match hit.position {
                Some(position) => println!(
                    "     - '{}' at offset {} (+{:.2})",
                    hit.term, position, hit.contribution
                ),
                None => println!("     - '{}'", hit.term),
            }
        }
    }

    if assessment.domain_match.is_near_miss() {
        if let (Some(best), Some(distance)) = (
            assessment.domain_match.best_match.as_ref(),
            assessment.domain_match.edit_distance,
        ) {
            println!(
                "   ⚠️  Sender domain '{}' is {} edit(s) from '{}'",
                assessment.domain_match.sender_domain_normalized, distance, best
            );
        }
    }

    if assessment.urls_truncated {
        println!(
            "   ⚠️  URL list truncated at {} entries",
            engine.config().max_urls_per_message
        );
    }

    println!();
    match serde_json::to_string_pretty(&assessment) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("❌ Error serializing assessment: {e}");
            process::exit(1);
        }
    }
}

fn evaluate_dataset_file(engine: &RiskEngine, dataset_file: &str) {
    let dataset = match evaluation::load_dataset(dataset_file) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("❌ Error loading dataset: {e:#}");
            process::exit(1);
        }
    };

    if dataset.is_empty() {
        println!("📭 Dataset is empty, nothing to evaluate");
        return;
    }

    let report = evaluation::evaluate_batch(engine, &dataset);
    print_report(&report);
}

fn print_report(report: &EvaluationReport) {
    println!("📊 Phishscore Evaluation Report");
    println!("═══════════════════════════════════════");
    println!();
    println!("📈 Dataset:");
    println!("  Total messages: {}", report.total);
    println!("  ├─ Ham: {}", report.ham);
    println!("  └─ Phishing: {}", report.phishing);
    println!();
    println!("🎯 Classification (phishing = positive):");
    println!("  Accuracy:  {:.1}%", report.accuracy() * 100.0);
    println!("  Precision: {:.1}%", report.confusion.precision() * 100.0);
    println!("  Recall:    {:.1}%", report.confusion.recall() * 100.0);
    println!();
    println!("  ├─ True positives:  {}", report.confusion.true_positive);
    println!("  ├─ False positives: {}", report.confusion.false_positive);
    println!("  ├─ True negatives:  {}", report.confusion.true_negative);
    println!("  └─ False negatives: {}", report.confusion.false_negative);
    println!();
    println!("🔎 Rule Trigger Rates:");
    println!("┌──────────────────────┬──────────┬────────┐");
    println!("│ Rule                 │ Messages │   Rate │");
    println!("├──────────────────────┼──────────┼────────┤");
    for rule in rules::ALL {
        let count = report.rule_trigger_counts.get(*rule).copied().unwrap_or(0);
        let rate = if report.total > 0 {
            count as f64 / report.total as f64 * 100.0
        } else {
            0.0
        };
        println!("│ {rule:<20} │ {count:>8} │ {rate:>5.1}% │");
    }
    println!("└──────────────────────┴──────────┴────────┘");
    println!();
    println!("📉 Score Distribution:");
    println!("  ├─ 0-2: {}", report.score_distribution.scores_0_to_2);
    println!("  ├─ 3-4: {}", report.score_distribution.scores_3_to_4);
    println!("  ├─ 5-6: {}", report.score_distribution.scores_5_to_6);
    println!("  └─ 7+:  {}", report.score_distribution.scores_7_plus);
}
