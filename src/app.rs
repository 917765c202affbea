use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use log::{debug, error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::ai_client::ModelHandle;
use crate::ai_imagery::{generate_images, ImageRequest};
use crate::ai_summarizer::OpenAiSummarizer;
use crate::ai_writer::{compose_social_post, generate_marketing_text, translate, ContentKind, MarketingBrief};
use crate::config::{Config, EnsureOutcome};
use crate::dashboards::Dashboards;
use crate::logger::init_logger;
use crate::pipeline::{build_report, NewsRequest};
use crate::retriever::GdeltFeed;
use crate::session::Session;
use crate::trends::{lookup, BigQueryTrends, TrendDateRange};
use crate::utils::format_report_plain_text;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Top search term(s) in the US for a date
    Trends(TrendsArgs),
    /// Summarize recent news articles about up to three keywords
    News(NewsArgs),
    /// Generate marketing copy
    Generate(GenerateArgs),
    /// Translate text into another language
    Translate {
        /// Target language, e.g. "French"
        #[arg(long)]
        to: String,
        text: String,
    },
    /// Generate images from a description
    Image {
        prompt: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u8,
        #[arg(long, default_value = "images")]
        out_dir: PathBuf,
    },
    /// List campaign dashboards, or print the embed URL of one
    Dashboard { name: Option<String> },
    /// Keep one session open and read commands from stdin
    Interactive,
}

#[derive(Args, Debug, Clone)]
pub struct TrendsArgs {
    /// Date as YYYY-MM-DD; defaults to the most recent available day
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct NewsArgs {
    /// Keyword to search for; repeat up to three times
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,
    /// Maximum number of news articles to return (1-20)
    #[arg(short = 'n', long)]
    max_records: Option<u32>,
    /// Also write a social media post from the summaries
    #[arg(long)]
    social: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, value_enum, default_value_t = ContentKind::BlogPost)]
    kind: ContentKind,
    /// What the copy is about
    #[arg(long)]
    topic: String,
    #[arg(long)]
    audience: Option<String>,
    #[arg(long)]
    tone: Option<String>,
    /// Also translate the result into this language
    #[arg(long)]
    translate_to: Option<String>,
}

/// One line typed in interactive mode.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "trendspot")]
struct ReplLine {
    #[command(subcommand)]
    command: ReplCommand,
}

#[derive(Subcommand, Debug)]
enum ReplCommand {
    /// Top search term(s) for a date
    Trends(TrendsArgs),
    /// Summarize news about up to three keywords
    News(NewsArgs),
    /// Write a social media post from the last report
    Social,
    /// Show the last results again
    Show,
    /// List dashboards or print one
    Dashboard { name: Option<String> },
    /// Leave interactive mode
    #[command(alias = "exit")]
    Quit,
}

/// Splits like a shell, so `news -k "street style"` keeps the phrase together.
fn parse_repl_line(line: &str) -> std::result::Result<ReplLine, String> {
    let words = shlex::split(line).ok_or_else(|| "Unbalanced quotes".to_string())?;
    ReplLine::try_parse_from(words).map_err(|e| e.to_string())
}

pub async fn run(command: Command, config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    init_logger(verbose)?;
    debug!("Logger initialized");

    let cfg = match config_path {
        Some(path) => Config::load(&path)?,
        None => {
            let config_outcome: EnsureOutcome = Config::ensure_user_config()?;
            if config_outcome.created {
                println!(
                    "Config file created at {}. Please edit it and restart the app.",
                    config_outcome.path.display()
                );
                return Ok(());
            }
            Config::get_user_config()?
        }
    };
    debug!("Config loaded");

    let app = App::new(cfg)?;
    let mut session = Session::new();

    match command {
        Command::Trends(args) => app.trends(&mut session, &args).await,
        Command::News(args) => app.news(&mut session, &args).await,
        Command::Generate(args) => app.generate(&args).await,
        Command::Translate { to, text } => {
            let translated = translate(&app.model, &text, &to).await?;
            println!("{}", translated);
            Ok(())
        }
        Command::Image {
            prompt,
            count,
            out_dir,
        } => app.image(&prompt, count, &out_dir).await,
        Command::Dashboard { name } => app.dashboard(name.as_deref()),
        Command::Interactive => app.interactive(&mut session).await,
    }
}

pub struct App {
    cfg: Config,
    http: reqwest::Client,
    model: ModelHandle,
}

impl App {
    pub fn new(cfg: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        debug!("HTTP client created");

        let model = ModelHandle::from_config(&cfg);
        Ok(App { cfg, http, model })
    }

    async fn trends(&self, session: &mut Session, args: &TrendsArgs) -> Result<()> {
        let range = TrendDateRange::for_today(Local::now().date_naive());
        let date = args.date.unwrap_or_else(|| range.default_date());

        let warehouse = self
            .cfg
            .warehouse
            .as_ref()
            .ok_or_else(|| anyhow!("`warehouse` is missing from the config file"))?;
        let source = BigQueryTrends::new(self.http.clone(), warehouse)?;

        let trend = lookup(&source, &range, date)
            .await
            .context("Trend lookup failed")?;
        println!("{}", trend.display_line());
        session.record_trend(trend);
        Ok(())
    }

    async fn news(&self, session: &mut Session, args: &NewsArgs) -> Result<()> {
        let mut request = NewsRequest::new(
            args.keywords.clone(),
            args.max_records.unwrap_or(self.cfg.news.max_records),
        );
        request.window_days = self.cfg.news.window_days;

        let feed = GdeltFeed::new(self.http.clone(), self.cfg.news.fetch_article_body);
        let summarizer = OpenAiSummarizer::new(self.model.clone())?;

        match build_report(&feed, &summarizer, &request, Utc::now()).await {
            Ok((keywords, report)) => {
                println!("{}", format_report_plain_text(&report));
                session.record_report(keywords, report);
            }
            Err(e) => {
                // Reported, not propagated: the previous report stays in the session
                if e.is_invalid_input() {
                    info!("News request rejected: {}", e);
                } else {
                    error!("News request failed: {}", e);
                }
                println!("{}", e.user_message());
                return Ok(());
            }
        }

        if args.social {
            self.social(session).await?;
        }
        Ok(())
    }

    async fn social(&self, session: &mut Session) -> Result<()> {
        let report = session
            .last_report
            .as_ref()
            .ok_or_else(|| anyhow!("Summarize some news first"))?;
        let post = compose_social_post(&self.model, report).await?;
        println!("\nSocial media post:\n{}", post);
        session.record_social_post(post);
        Ok(())
    }

    async fn generate(&self, args: &GenerateArgs) -> Result<()> {
        let brief = MarketingBrief {
            kind: args.kind,
            topic: args.topic.clone(),
            audience: args.audience.clone(),
            tone: args.tone.clone(),
            translate_to: args.translate_to.clone(),
        };
        let generated = generate_marketing_text(&self.model, &brief).await?;
        println!("{}", generated.text);
        if let Some(translation) = generated.translation {
            println!("\n--- {} ---\n{}", translation.language, translation.text);
        }
        Ok(())
    }

    async fn image(&self, prompt: &str, count: u8, out_dir: &std::path::Path) -> Result<()> {
        let request = ImageRequest {
            prompt,
            count,
            out_dir,
        };
        let paths = generate_images(
            &self.model.client,
            &self.cfg.image_model,
            self.cfg.request_timeout_secs,
            &request,
        )
        .await?;
        for path in paths {
            println!("{}", path.display());
        }
        Ok(())
    }

    fn dashboard(&self, name: Option<&str>) -> Result<()> {
        let dashboards = Dashboards::new(&self.cfg.dashboards);
        match name {
            Some(name) if !dashboards.is_empty() => println!("{}", dashboards.resolve(name)?),
            _ => println!("{}", dashboards.listing()),
        }
        Ok(())
    }

    fn show(&self, session: &Session) {
        if session.is_empty() {
            println!("Nothing to show yet.");
            return;
        }
        if let Some(trend) = &session.last_trend {
            println!("{}", trend.display_line());
        }
        if let Some(keywords) = &session.last_keywords {
            println!("\nLast keywords: {}", keywords.joined());
        }
        if let Some(report) = &session.last_report {
            println!("\n{}", format_report_plain_text(report));
        }
        if let Some(post) = &session.last_social_post {
            println!("\nSocial media post:\n{}", post);
        }
    }

    async fn interactive(&self, session: &mut Session) -> Result<()> {
        println!("Commands: trends [--date YYYY-MM-DD], news -k <keyword>... [-n N] [--social], social, show, dashboard [name], quit");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let parsed = match parse_repl_line(&line) {
                Ok(parsed) => parsed,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            };

            let outcome = match parsed.command {
                ReplCommand::Trends(args) => self.trends(session, &args).await,
                ReplCommand::News(args) => self.news(session, &args).await,
                ReplCommand::Social => self.social(session).await,
                ReplCommand::Show => {
                    self.show(session);
                    Ok(())
                }
                ReplCommand::Dashboard { name } => self.dashboard(name.as_deref()),
                ReplCommand::Quit => break,
            };

            // A failed submission leaves the session as it was
            if let Err(e) = outcome {
                error!("{:?}", e);
                println!("Error: {:#}", e);
            }
        }
        Ok(())
    }
}
