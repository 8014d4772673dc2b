use clap::{Args, Parser as ClapParser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode};
use std::io::{self, Read};
use tansy_lang::Config;
use tansy_lang::cli::{self, CliError, EvalOptions, EvalOutcome};

#[derive(ClapParser)]
#[command(name = "tansy")]
#[command(about = "Tansy - query and rewrite structured documents")]
#[command(version)]
struct Cli {
    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against each document separately
    Eval(EvalArgs),

    /// Evaluate an expression against all documents as one stream
    EvalAll(EvalArgs),
}

#[derive(Args)]
struct EvalArgs {
    /// The expression to evaluate
    expression: String,

    /// JSON input (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate syntax, don't execute
    #[arg(long)]
    syntax_only: bool,

    /// Make env and strenv fail
    #[arg(long)]
    no_env: bool,

    /// Make load and load_str fail
    #[arg(long)]
    no_file_ops: bool,

    /// strftime-style layout used by the date operators
    #[arg(long)]
    datetime_layout: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Eval(args) => run_eval(args, false),
        Commands::EvalAll(args) => run_eval(args, true),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // A logger can only be installed once; a second attempt is harmless.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]);
}

fn run_eval(args: EvalArgs, together: bool) -> Result<(), CliError> {
    let input = match args.input {
        Some(s) => Some(s),
        None if !args.syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    };

    let mut config = Config::default()
        .with_env_ops(!args.no_env)
        .with_file_ops(!args.no_file_ops);
    if let Some(layout) = args.datetime_layout {
        config = config.with_date_time_layout(layout);
    }

    let options = EvalOptions {
        expression: args.expression,
        input,
        pretty: args.pretty,
        syntax_only: args.syntax_only,
        together,
        config,
    };

    match cli::execute(&options)? {
        EvalOutcome::SyntaxValid => println!("Syntax is valid"),
        EvalOutcome::Output(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
    }
    Ok(())
}
