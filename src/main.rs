use dotenvy::dotenv;
use newsroom_bot::bot::event::InboundEvent;
use newsroom_bot::bot::store::{ConversationStore, GreetedSet, ResultCache};
use newsroom_bot::bot::{ChatRouter, DialogController};
use newsroom_bot::config::Settings;
use newsroom_bot::gateway::TelegramGateway;
use newsroom_bot::generation::{ArticleGenerator, GenerationClient};
use newsroom_bot::publish::{
    BaserowClient, ImageRehoster, ImgbbClient, PublishDispatcher, SitePublisher,
};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
    baserow: Regex,
    imgbb: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            baserow: Regex::new(r"BASEROW_TOKEN=[^\s&]+")?,
            imgbb: Regex::new(r"IMGBB_API_KEY=[^\s&]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_url
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .baserow
            .replace_all(&output, "BASEROW_TOKEN=[MASKED]")
            .to_string();
        output = self
            .imgbb
            .replace_all(&output, "IMGBB_API_KEY=[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Bot commands recognized in any dialog phase
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Full reset plus greeting
    Start,
    /// Liveness line with store entry counts
    Healthcheck,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting newsroom bot...");

    let settings = init_settings();

    let bot = Bot::new(settings.telegram_token.clone());
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let generator = init_generator(&settings);

    let dispatcher = PublishDispatcher::new(
        gateway.clone(),
        init_site_publisher(&settings, generator.clone()),
        settings.channel_id,
    );

    let controller = Arc::new(DialogController::new(
        gateway,
        generator,
        dispatcher,
        ConversationStore::new(),
        ResultCache::new(),
        GreetedSet::new(),
    ));
    let router = Arc::new(ChatRouter::new(controller.clone()));

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_generator(settings: &Settings) -> Arc<dyn ArticleGenerator> {
    match GenerationClient::new(
        settings.webhook_url.clone(),
        settings.generation_timeout_secs,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build generation client: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Site publish strategy per configuration: tabular when the Baserow
/// endpoint and token are present, webhook publish otherwise. Rehosting
/// joins the tabular strategy only when the ImgBB key is configured.
fn init_site_publisher(settings: &Settings, generator: Arc<dyn ArticleGenerator>) -> SitePublisher {
    if settings.tabular_publish_enabled() {
        match build_tabular_publisher(settings) {
            Ok(publisher) => publisher,
            Err(e) => {
                error!("Failed to build tabular publisher: {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        info!("Site publish strategy: webhook");
        SitePublisher::Webhook(generator)
    }
}

fn build_tabular_publisher(settings: &Settings) -> anyhow::Result<SitePublisher> {
    let api_url = settings.baserow_api_url.clone().unwrap_or_default();
    let token = settings.baserow_token.clone().unwrap_or_default();
    let records = Arc::new(BaserowClient::new(
        api_url,
        token,
        settings.generation_timeout_secs,
    )?);

    let rehoster = match settings.imgbb_api_key.as_ref() {
        Some(key) => Some(Arc::new(ImgbbClient::new(
            settings.imgbb_upload_url.clone(),
            key.clone(),
            settings.generation_timeout_secs,
        )?) as Arc<dyn ImageRehoster>),
        None => None,
    };

    info!(
        "Site publish strategy: tabular (rehosting {})",
        if rehoster.is_some() { "on" } else { "off" }
    );
    Ok(SitePublisher::Tabular { records, rehoster })
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback_query))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some())
                        .endpoint(handle_text_message),
                ),
        )
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    router: Arc<ChatRouter>,
    controller: Arc<DialogController>,
) -> Result<(), teloxide::RequestError> {
    let chat_id = msg.chat.id.0;
    match cmd {
        Command::Start => {
            router.dispatch(InboundEvent::StartCommand { chat_id }).await;
        }
        Command::Healthcheck => {
            if let Err(e) = controller.healthcheck(chat_id).await {
                error!("Healthcheck error: {}", e);
            }
        }
    }
    respond(())
}

async fn handle_text_message(
    msg: Message,
    router: Arc<ChatRouter>,
) -> Result<(), teloxide::RequestError> {
    if let Some(text) = msg.text() {
        router
            .dispatch(InboundEvent::TextMessage {
                chat_id: msg.chat.id.0,
                text: text.to_string(),
            })
            .await;
    }
    respond(())
}

async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    router: Arc<ChatRouter>,
) -> Result<(), teloxide::RequestError> {
    // Stop the button spinner; duplicated or late answers are harmless.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        debug!("answer_callback_query skipped: {}", e);
    }

    let (Some(message), Some(payload)) = (q.message, q.data) else {
        debug!("Callback query without message or payload");
        return respond(());
    };

    router
        .dispatch(InboundEvent::ButtonCallback {
            chat_id: message.chat().id.0,
            message_id: message.id().0,
            payload,
        })
        .await;
    respond(())
}
