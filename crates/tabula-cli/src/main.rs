use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;
use tabula_lang::{Program, ProgramError};
use tabula_solver::{BigRational, DEFAULT_MAX_PIVOTS, Simplex, Solution, format_decimal};

const DECIMAL_PLACES: usize = 6;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Exact rational simplex solver for small linear programs", long_about = None)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Maximize an objective subject to <= constraints
    Solve {
        /// Objective to maximize, e.g. "x + y"
        #[arg(short, long)]
        maximize: String,
        /// Constraint such as "2x + y <= 4", repeat for each row
        #[arg(short = 'c', long = "constraint", required = true)]
        constraints: Vec<String>,
        /// Give up after this many pivots
        #[arg(long, default_value_t = DEFAULT_MAX_PIVOTS)]
        max_pivots: usize,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Print the tableau before every pivot and after the last one
        #[arg(long)]
        trace: bool,
    },
    /// Parse a problem and print the assembled c, A and b
    Check {
        /// Objective to maximize
        #[arg(short, long)]
        maximize: String,
        /// Constraint such as "2x + y <= 4", repeat for each row
        #[arg(short = 'c', long = "constraint", required = true)]
        constraints: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

#[derive(Serialize)]
struct Assignment<'a> {
    name: &'a str,
    value: String,
    decimal: String,
}

#[derive(Serialize)]
struct Report<'a> {
    status: String,
    variables: Vec<Assignment<'a>>,
    objective_value: String,
    slack: Vec<String>,
    binding_constraints: Vec<usize>,
    pivots: usize,
}

impl<'a> Report<'a> {
    fn new(program: &'a Program, solution: &Solution) -> Self {
        Self {
            status: solution.state.to_string(),
            variables: program
                .assignments(&solution.values)
                .into_iter()
                .map(|(name, value)| Assignment {
                    name,
                    value: value.to_string(),
                    decimal: format_decimal(value, DECIMAL_PLACES),
                })
                .collect(),
            objective_value: solution.objective_value.to_string(),
            slack: solution.slack.iter().map(ToString::to_string).collect(),
            binding_constraints: solution.binding_constraints(),
            pivots: solution.pivots,
        }
    }
}

fn setup_logger(verbosity: u8) -> Result<(), fern::InitError> {
    use fern::colors::{Color, ColoredLevelConfig};
    let colors = ColoredLevelConfig::new()
        .debug(Color::White)
        .info(Color::Green)
        .warn(Color::BrightYellow)
        .error(Color::BrightRed);

    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{:5} | {} | {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn row(values: &[BigRational]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Print a tableau snapshot to stderr.
fn trace_tableau(simplex: &Simplex) {
    eprintln!("Tableau after {} pivots:", simplex.pivot_count());
    eprintln!("{}", simplex);
    eprintln!();
}

fn print_pretty(program: &Program, constraints: &[String], solution: &Solution) {
    println!("Status: {}", solution.state);
    println!(
        "Objective value: {} ({})",
        solution.objective_value,
        format_decimal(&solution.objective_value, DECIMAL_PLACES)
    );
    println!("Pivots: {}", solution.pivots);
    println!();

    println!("Variables:");
    for (name, value) in program.assignments(&solution.values) {
        println!(
            "  {:10} {:>14} ({})",
            name,
            value.to_string(),
            format_decimal(value, DECIMAL_PLACES)
        );
    }

    let binding = solution.binding_constraints();
    if !binding.is_empty() {
        println!();
        println!("Binding constraints:");
        for i in binding {
            println!("  - [{}] {}", i, constraints[i]);
        }
    }
}

fn solve(
    maximize: &str,
    constraints: &[String],
    max_pivots: usize,
    format: Format,
    trace: bool,
) -> Result<(), ProgramError> {
    let program = Program::parse(maximize, constraints)?;
    let mut simplex = program.simplex()?.with_max_pivots(max_pivots);

    let outcome = if trace {
        simplex.solve_with(trace_tableau)
    } else {
        simplex.solve()
    };

    let solution = simplex.report();
    match format {
        Format::Json => match serde_json::to_string_pretty(&Report::new(&program, &solution)) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing report: {}", e),
        },
        Format::Pretty => print_pretty(&program, constraints, &solution),
    }

    outcome.map_err(ProgramError::from)
}

fn check(maximize: &str, constraints: &[String]) -> Result<(), ProgramError> {
    let program = Program::parse(maximize, constraints)?;

    println!("Variables: {}", program.variables().join(", "));
    println!("Objective (c): [{}]", row(program.objective()));
    println!("Constraints (A x <= b):");
    for (coefficients, rhs) in program.constraints().iter().zip(program.rhs()) {
        println!("  [{}] <= {}", row(coefficients), rhs);
    }

    // Surface dimension and sign problems without solving
    program.problem()?;
    println!();
    println!("OK");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logger(cli.verbose) {
        eprintln!("Error initializing logger: {}", e);
    }

    let result = match cli.command {
        Commands::Solve {
            maximize,
            constraints,
            max_pivots,
            format,
            trace,
        } => solve(&maximize, &constraints, max_pivots, format, trace),
        Commands::Check {
            maximize,
            constraints,
        } => check(&maximize, &constraints),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
