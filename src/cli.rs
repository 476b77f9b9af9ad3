use clap::{Args, Parser, Subcommand, ValueEnum};
use pagerender_lib::{ImageFormat, MediaType, PaperFormat, Viewport, WaitUntil};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagerender")]
#[command(
    version,
    about = "Render a URL to HTML, PDF, or an image with headless Chromium",
    long_about = "pagerender\n\nModes:\n- html: serialized DOM after navigation.\n- pdf: print the page to PDF (print media unless --media is given).\n- screenshot: capture the viewport or full page as png/jpeg/webp.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) with launch/page/viewport/screenshot defaults; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the page's serialized DOM
    Html {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Print the page to PDF
    Pdf {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        pdf: PdfArgs,
    },
    /// Capture a screenshot of the page
    Screenshot {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        shot: ScreenshotArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[arg(help = "URL to render (http:// or https://)")]
    pub url: String,

    #[arg(long, short, help = "Output file path (stdout if omitted)")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value = "raw",
        help = "raw writes the rendered document; json writes a descriptor (binary data base64-encoded)"
    )]
    pub format: OutputFormat,

    #[arg(long, value_enum, help = "Navigation readiness condition [default: load]")]
    pub wait_until: Option<WaitUntilArg>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Navigation timeout in seconds; 0 disables it [default: 30]"
    )]
    pub nav_timeout: Option<u64>,

    #[arg(
        long,
        value_name = "JSON",
        help = "Extra HTTP headers as a JSON object, e.g. '{\"x-api-key\":\"abc\"}'"
    )]
    pub headers: Option<String>,

    #[arg(long, value_enum, help = "CSS media type to emulate")]
    pub media: Option<MediaArg>,

    #[arg(long, requires = "password", help = "HTTP basic-auth username")]
    pub username: Option<String>,

    #[arg(long, requires = "username", help = "HTTP basic-auth password")]
    pub password: Option<String>,

    #[arg(long, value_name = "PATH", help = "Chrome/Chromium executable")]
    pub chrome: Option<PathBuf>,

    #[arg(long, help = "Launch the browser with a visible window")]
    pub headful: bool,

    #[arg(
        long = "chrome-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help = "Extra browser flag (repeatable); flags that clash with the built-in isolation flags are ignored"
    )]
    pub chrome_args: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PdfArgs {
    #[arg(long, help = "Landscape orientation")]
    pub landscape: bool,

    #[arg(long, help = "Print background graphics")]
    pub print_background: bool,

    #[arg(long, help = "Rendering scale (0.1-2.0)")]
    pub scale: Option<f64>,

    #[arg(long, value_enum, help = "Paper format [default: letter]")]
    pub paper: Option<PaperArg>,

    #[arg(long, value_name = "INCHES", help = "Uniform page margin in inches")]
    pub margin: Option<f64>,

    #[arg(long, value_name = "RANGES", help = "Pages to print, e.g. 1-5, 8")]
    pub page_ranges: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScreenshotArgs {
    #[arg(
        long,
        help = "Viewport as WIDTHxHEIGHT, optionally with @SCALEx (e.g. 390x844@3x) [default: 1440x900]"
    )]
    pub viewport: Option<Viewport>,

    #[arg(long, help = "Device scale factor [default: 1]")]
    pub scale_factor: Option<f64>,

    #[arg(long = "type", value_enum, help = "Image format [default: png]")]
    pub image_type: Option<ImageTypeArg>,

    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(0..=100),
        help = "Image quality 0-100 (jpeg/webp only)"
    )]
    pub quality: Option<u8>,

    #[arg(long, help = "Capture the full scrollable page")]
    pub full_page: bool,

    #[arg(long, help = "Transparent background (png/webp)")]
    pub omit_background: bool,

    #[arg(
        long,
        value_name = "MILLIS",
        help = "Wait up to this long for animations to settle before capturing; 0 disables [default: 0]"
    )]
    pub animation_timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Raw,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum WaitUntilArg {
    Load,
    #[value(name = "domcontentloaded")]
    DomContentLoaded,
    #[value(name = "networkidle", alias = "networkidle0", alias = "networkidle2")]
    NetworkIdle,
}

impl From<WaitUntilArg> for WaitUntil {
    fn from(arg: WaitUntilArg) -> Self {
        match arg {
            WaitUntilArg::Load => WaitUntil::Load,
            WaitUntilArg::DomContentLoaded => WaitUntil::DomContentLoaded,
            WaitUntilArg::NetworkIdle => WaitUntil::NetworkIdle,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum MediaArg {
    Screen,
    Print,
}

impl From<MediaArg> for MediaType {
    fn from(arg: MediaArg) -> Self {
        match arg {
            MediaArg::Screen => MediaType::Screen,
            MediaArg::Print => MediaType::Print,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ImageTypeArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
    Webp,
}

impl From<ImageTypeArg> for ImageFormat {
    fn from(arg: ImageTypeArg) -> Self {
        match arg {
            ImageTypeArg::Png => ImageFormat::Png,
            ImageTypeArg::Jpeg => ImageFormat::Jpeg,
            ImageTypeArg::Webp => ImageFormat::Webp,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum PaperArg {
    Letter,
    Legal,
    Tabloid,
    A3,
    A4,
    A5,
}

impl From<PaperArg> for PaperFormat {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::Letter => PaperFormat::Letter,
            PaperArg::Legal => PaperFormat::Legal,
            PaperArg::Tabloid => PaperFormat::Tabloid,
            PaperArg::A3 => PaperFormat::A3,
            PaperArg::A4 => PaperFormat::A4,
            PaperArg::A5 => PaperFormat::A5,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_command_uses_defaults() {
        let cli = Cli::parse_from(["pagerender", "html", "https://example.com"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Html { common } => {
                assert_eq!(common.url, "https://example.com");
                assert!(common.output.is_none());
                assert_eq!(common.format, OutputFormat::Raw);
                assert!(common.wait_until.is_none());
                assert!(common.nav_timeout.is_none());
                assert!(common.headers.is_none());
                assert!(common.media.is_none());
                assert!(common.username.is_none());
                assert!(!common.headful);
                assert!(common.chrome_args.is_empty());
            }
            _ => panic!("expected html command"),
        }
    }

    #[test]
    fn screenshot_command_respects_overrides() {
        let cli = Cli::parse_from([
            "pagerender",
            "screenshot",
            "https://example.com",
            "--viewport",
            "800x600",
            "--type",
            "jpg",
            "--quality",
            "75",
            "--animation-timeout",
            "1500",
            "--full-page",
            "--wait-until",
            "networkidle2",
            "--chrome-arg",
            "--lang=de-DE",
            "--verbose",
            "-o",
            "shot.jpeg",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Screenshot { common, shot } => {
                assert_eq!(common.output, Some(PathBuf::from("shot.jpeg")));
                assert_eq!(common.wait_until, Some(WaitUntilArg::NetworkIdle));
                assert_eq!(common.chrome_args, vec!["--lang=de-DE".to_string()]);
                assert_eq!(shot.viewport, Some(Viewport::new(800, 600)));
                assert_eq!(shot.image_type, Some(ImageTypeArg::Jpeg));
                assert_eq!(shot.quality, Some(75));
                assert_eq!(shot.animation_timeout, Some(1500));
                assert!(shot.full_page);
            }
            _ => panic!("expected screenshot command"),
        }
    }

    #[test]
    fn pdf_command_parses_layout_flags() {
        let cli = Cli::parse_from([
            "pagerender",
            "pdf",
            "https://example.com",
            "--landscape",
            "--paper",
            "a4",
            "--margin",
            "0.5",
            "--media",
            "screen",
            "--config",
            "pagerender.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("pagerender.toml")));
        match cli.command {
            Commands::Pdf { common, pdf } => {
                assert_eq!(common.media, Some(MediaArg::Screen));
                assert!(pdf.landscape);
                assert_eq!(pdf.paper, Some(PaperArg::A4));
                assert_eq!(pdf.margin, Some(0.5));
            }
            _ => panic!("expected pdf command"),
        }
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        let result = Cli::try_parse_from([
            "pagerender",
            "screenshot",
            "https://example.com",
            "--quality",
            "101",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn username_requires_password() {
        let result = Cli::try_parse_from([
            "pagerender",
            "html",
            "https://example.com",
            "--username",
            "alice",
        ]);
        assert!(result.is_err());
    }
}
