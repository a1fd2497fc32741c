//! Evaluates expressions from the command line.
//!
//! Usage: `exprengine [--angle deg] [--simplify | --derive x | --tokens] [EXPR]...`
//!
//! Without expressions, every line of stdin is read as one. All expressions share
//! one environment, so `a := 2` on one line is visible on the next.

use clap::Parser;
use env_logger::Env;
use exprengine::{AngleMode, Error, Processor};
use std::io::BufRead;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "exprengine")]
#[command(about = "Evaluate, simplify or differentiate expressions")]
struct Args {
    /// Unit in which plain numbers are read by circular functions
    #[arg(long, default_value = "rad")]
    angle: AngleMode,

    /// Print the simplified expression instead of its value
    #[arg(long, conflicts_with_all = ["derive", "tokens"])]
    simplify: bool,

    /// Print the simplified derivative with respect to this variable
    #[arg(long, value_name = "VAR", conflicts_with = "tokens")]
    derive: Option<String>,

    /// Print the tokens of each expression
    #[arg(long)]
    tokens: bool,

    /// Expressions to process; read from stdin when empty
    expressions: Vec<String>,
}

fn run(processor: &mut Processor, args: &Args, text: &str) -> Result<(), Error> {
    if args.tokens {
        for token in processor.tokenize(text)? {
            println!("{}", token);
        }
    } else if args.simplify {
        println!("{}", processor.simplify(text)?);
    } else if let Some(var) = &args.derive {
        println!("{}", processor.differentiate(text, var)?);
    } else {
        let value = processor.solve(text)?;
        let rendered = value.to_string();
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut processor = Processor::new().with_angle_mode(args.angle);

    let expressions: Vec<String> = if args.expressions.is_empty() {
        std::io::stdin().lock().lines().map_while(Result::ok).collect()
    } else {
        args.expressions.clone()
    };

    let mut failed = false;
    for text in expressions.iter().map(|line| line.trim()).filter(|line| !line.is_empty()) {
        if let Err(err) = run(&mut processor, &args, text) {
            eprintln!("{}: {}", text, err);
            failed = true;
        }
    }

    if failed {
        process::exit(1);
    }
}
