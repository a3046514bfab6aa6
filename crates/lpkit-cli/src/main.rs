use clap::{Parser, Subcommand, ValueEnum};
use lpkit_solver::{
    Analyzer, BranchAndBound, CuttingPlane, Knapsack, Problem, RevisedSimplex, SolveResult,
    Solver, TableauSimplex, VarKind,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lpkit")]
#[command(about = "Solve linear and integer programs from text model files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// Two-phase primal simplex on the full tableau
    Simplex,
    /// Revised simplex using the basis inverse
    Revised,
    /// Branch and bound for integer programs
    BranchBound,
    /// Cutting-plane loop with variable bound cuts
    CuttingPlane,
    /// 0/1 knapsack branch and bound (single capacity constraint)
    Knapsack,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a model file and print the program it describes
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check a model file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Solve a model and print the optimal solution
    Solve {
        /// The file containing the model
        file: PathBuf,
        /// Algorithm to run
        #[arg(short, long, value_enum, default_value_t = Algorithm::Simplex)]
        algorithm: Algorithm,
        /// Print the per-iteration solver log
        #[arg(short, long)]
        log: bool,
        /// Emit the full result as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Sensitivity and duality analysis of a model's optimal solution
    Analyze {
        /// The file containing the model
        file: PathBuf,
        /// Range a single value by its 1-based position (objective
        /// coefficients first, then each constraint row followed by its RHS)
        #[arg(short, long)]
        index: Option<usize>,
        /// Print the shadow price of every constraint
        #[arg(short, long)]
        shadow_prices: bool,
        /// Construct, solve, and verify the dual program
        #[arg(short, long)]
        dual: bool,
    },
}

fn load_problem(file: &PathBuf) -> Problem {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };

    match lpkit_text::parse(&source) {
        Ok(problem) => problem,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_solver(problem: &Problem, algorithm: Algorithm) -> SolveResult {
    let outcome = match algorithm {
        Algorithm::Simplex => TableauSimplex::new().solve(problem),
        Algorithm::Revised => RevisedSimplex::new().solve(problem),
        Algorithm::BranchBound => BranchAndBound::new().solve(problem),
        Algorithm::CuttingPlane => CuttingPlane::new().solve(problem),
        Algorithm::Knapsack => Knapsack::new().solve(problem),
    };

    match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Solver error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_result(result: &SolveResult) {
    if result.is_unbounded {
        println!("Status: UNBOUNDED");
        println!("The problem has no finite optimal solution.");
        std::process::exit(1);
    }
    if !result.is_optimal {
        if result.is_feasible {
            println!("Status: ITERATION LIMIT");
            println!("The solver stopped before reaching an optimum.");
        } else {
            println!("Status: INFEASIBLE");
            println!("No solution exists that satisfies all constraints.");
        }
        std::process::exit(1);
    }

    println!("Status: OPTIMAL");
    println!("Objective: {:.3}", result.objective);
    for (j, v) in result.solution.iter().enumerate() {
        println!("  x{:<3} {:10.3}", j + 1, v);
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, format } => {
            let problem = load_problem(&file);
            if format == "json" {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&problem)
                        .unwrap_or_else(|e| format!("Error: {}", e))
                );
            } else {
                println!("{}", problem);
            }
        }
        Commands::Check { file } => {
            let problem = load_problem(&file);
            let integers = problem
                .variables
                .iter()
                .filter(|v| v.kind == VarKind::Integer)
                .count();
            let binaries = problem
                .variables
                .iter()
                .filter(|v| v.kind == VarKind::Binary)
                .count();

            println!("✓ {} is valid", file.display());
            println!("  {} variables", problem.num_variables());
            println!("  {} constraints", problem.num_constraints());
            println!("  {} integer", integers);
            println!("  {} binary", binaries);
        }
        Commands::Solve {
            file,
            algorithm,
            log,
            json,
        } => {
            let problem = load_problem(&file);
            let result = run_solver(&problem, algorithm);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result)
                        .unwrap_or_else(|e| format!("Error: {}", e))
                );
                return;
            }
            if log {
                println!("{}", result.log);
            }
            print_result(&result);
        }
        Commands::Analyze {
            file,
            index,
            shadow_prices,
            dual,
        } => {
            if index.is_none() && !shadow_prices && !dual {
                eprintln!("Nothing to analyze: pass --index, --shadow-prices, or --dual.");
                std::process::exit(1);
            }

            let problem = load_problem(&file);
            let result = run_solver(&problem, Algorithm::Simplex);
            let analyzer = match Analyzer::new(&problem, &result) {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("Analysis error: {}", e);
                    std::process::exit(1);
                }
            };

            if let Some(index) = index {
                match analyzer.unified_range(index) {
                    Ok(range) => println!("{}", range),
                    Err(e) => {
                        eprintln!("Analysis error: {}", e);
                        std::process::exit(1);
                    }
                }
            }

            if shadow_prices {
                for price in analyzer.shadow_prices() {
                    println!("{}", price);
                }
            }

            if dual {
                match analyzer.dual() {
                    Ok(report) => println!("{}", report),
                    Err(e) => {
                        eprintln!("Analysis error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}
