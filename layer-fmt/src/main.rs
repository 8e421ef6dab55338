//! layer-fmt — parse, repair and print Telegram message entities.
//!
//! Reads a message from stdin, parses it with the chosen markup dialect,
//! runs it through `fix_formatted_text` and prints the clean text followed
//! by one entity per line.
//!
//! ```text
//! echo '*bold* for @durov' | cargo run -p layer-fmt -- --markdown-v2
//! ```

use tokio::io::AsyncReadExt;

use layer_actor::{Actor, Error as ActorError, MailboxConfig, Promise, spawn_actor};
use layer_entities::{
    FixOptions, FormattedText, get_markdown_v3, parse_html, parse_markdown, parse_markdown_v2, parse_markdown_v3,
};

const USAGE: &str = "\
usage: layer-fmt [DIALECT] [OPTIONS] < message.txt

dialects:
  --plain            no markup (default)
  --markdown         legacy Markdown
  --markdown-v2      MarkdownV2
  --markdown-v3      client-side Markdown over plain text
  --html             HTML

options:
  --no-detect        do not look for mentions, links, hashtags...
  --no-commands      do not look for /bot_commands
  --no-timestamps    do not look for media timestamps
  --keep-whitespace  skip leading/trailing whitespace trimming
  --allow-empty      accept texts that end up empty
  --render-v3        also print the result rendered back as Markdown V3";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dialect {
    Plain,
    Markdown,
    MarkdownV2,
    MarkdownV3,
    Html,
}

#[derive(Debug, PartialEq)]
struct Args {
    dialect:   Dialect,
    options:   FixOptions,
    render_v3: bool,
}

/// `Ok(None)` means help was requested.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>, String> {
    let mut parsed = Args { dialect: Dialect::Plain, options: FixOptions::new(), render_v3: false };
    for arg in args {
        match arg.as_str() {
            "--plain"           => parsed.dialect = Dialect::Plain,
            "--markdown"        => parsed.dialect = Dialect::Markdown,
            "--markdown-v2"     => parsed.dialect = Dialect::MarkdownV2,
            "--markdown-v3"     => parsed.dialect = Dialect::MarkdownV3,
            "--html"            => parsed.dialect = Dialect::Html,
            "--no-detect"       => parsed.options = parsed.options.skip_new_entities(true),
            "--no-commands"     => parsed.options = parsed.options.skip_bot_commands(true),
            "--no-timestamps"   => parsed.options = parsed.options.skip_media_timestamps(true),
            "--keep-whitespace" => parsed.options = parsed.options.skip_trim(true),
            "--allow-empty"     => parsed.options = parsed.options.allow_empty(true),
            "--render-v3"       => parsed.render_v3 = true,
            "-h" | "--help"     => return Ok(None),
            other => return Err(format!("unknown argument {other:?}\n\n{USAGE}")),
        }
    }
    Ok(Some(parsed))
}

// ─── Formatter actor ──────────────────────────────────────────────────────────

struct Formatter {
    options:   FixOptions,
    formatted: usize,
}

impl Actor for Formatter {
    fn tear_down(&mut self) {
        tracing::info!("[layer-fmt] formatted {} message(s)", self.formatted);
    }
}

impl Formatter {
    fn format(&mut self, dialect: Dialect, mut text: String) -> layer_entities::Result<FormattedText> {
        let entities = match dialect {
            Dialect::Plain      => Vec::new(),
            Dialect::Markdown   => parse_markdown(&mut text)?,
            Dialect::MarkdownV2 => parse_markdown_v2(&mut text)?,
            Dialect::Html       => parse_html(&mut text)?,
            Dialect::MarkdownV3 => {
                let parsed = parse_markdown_v3(FormattedText::plain(text));
                text = parsed.text;
                parsed.entities
            }
        };
        let mut formatted = FormattedText::new(text, entities);
        let trimmed = formatted.fix(&self.options)?;
        if trimmed > 0 {
            tracing::debug!("[layer-fmt] trimmed {trimmed} leading byte(s)");
        }
        self.formatted += 1;
        Ok(formatted)
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "layer_entities=info,layer_fmt=info"); }
    }
    env_logger::init();
    if let Err(e) = run().await {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let formatter = Formatter { options: args.options, formatted: 0 };
    let (handle, task) = spawn_actor("formatter", formatter, MailboxConfig::default().capacity(1));
    let dialect = args.dialect;
    let result = handle
        .send_promise(move |f: &mut Formatter, mut promise: Promise<FormattedText>| {
            promise.set_result(f.format(dialect, input).map_err(|e| ActorError::new(e.code(), e.to_string())));
        })
        .await;
    let formatted = result.await?;
    drop(handle);
    task.await?;

    println!("{}", formatted.text);
    for entity in &formatted.entities {
        println!("{entity}");
    }
    if args.render_v3 {
        println!("{}", get_markdown_v3(formatted).text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Option<Args>, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags() {
        let parsed = args(&["--html", "--no-commands", "--render-v3"]).unwrap().unwrap();
        assert_eq!(parsed.dialect, Dialect::Html);
        assert_eq!(parsed.options, FixOptions::new().skip_bot_commands(true));
        assert!(parsed.render_v3);
        assert_eq!(args(&["--help"]), Ok(None));
        assert!(args(&["--bogus"]).unwrap_err().starts_with("unknown argument \"--bogus\""));
    }

    #[test]
    fn formats_each_dialect() {
        let mut formatter = Formatter { options: FixOptions::new(), formatted: 0 };
        let text = formatter.format(Dialect::Html, "<b>hi</b> @durov\n".into()).unwrap();
        assert_eq!(text.text, "hi @durov");
        assert_eq!(text.entities.len(), 2);

        let text = formatter.format(Dialect::MarkdownV3, "**hi**".into()).unwrap();
        assert_eq!(text.text, "hi");

        assert_eq!(
            formatter.format(Dialect::Plain, " \n".into()).unwrap_err().to_string(),
            "Text must be non-empty"
        );
        assert_eq!(formatter.formatted, 2);
    }
}
