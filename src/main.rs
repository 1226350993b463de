use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;

use bp_nativize::backend::{
    BackendOptions, FunctionReport, GeneratedClass, LogLevel, StderrLogger, generate_functions,
};
use bp_nativize::compiled_ir::CompiledClass;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputStream {
    Header,
    Body,
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "bp-nativize")]
#[command(about = "Generate C++ from compiled blueprint classes")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Emit the header and body of a class
    Emit {
        /// Path to the compiled class JSON
        ir_file: String,

        /// Filter functions by name (optional)
        #[arg(short, long)]
        filter: Option<String>,

        /// Which stream to print
        #[arg(short = 'o', long, default_value = "both")]
        output: OutputStream,

        /// Minimum level of diagnostics written to stderr
        #[arg(long, default_value = "warn")]
        log_level: LogLevel,

        /// Cache reflective property lookups in function-local statics
        #[arg(long)]
        static_property_lookups: bool,

        /// Backend options JSON file
        #[arg(long)]
        options: Option<String>,
    },
    /// Generate CSV statistics for all functions
    Stats {
        /// Path to the compiled class JSON
        ir_file: String,

        /// Filter functions by name (optional)
        #[arg(short, long)]
        filter: Option<String>,

        /// Output CSV file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Emit {
            ir_file,
            filter,
            output,
            log_level,
            static_property_lookups,
            options,
        } => {
            let mut backend_options = match options {
                Some(path) => load_options(&path)?,
                None => BackendOptions::default(),
            };
            backend_options.use_static_property_lookups |= static_property_lookups;
            run_emit(&ir_file, filter, output, log_level, &backend_options)
        }
        Commands::Stats {
            ir_file,
            filter,
            output,
        } => run_stats(&ir_file, filter, output),
    }
}

fn load_options(path: &str) -> Result<BackendOptions> {
    let json = fs::read_to_string(path).with_context(|| format!("reading options {path}"))?;
    BackendOptions::from_json(&json).with_context(|| format!("parsing options {path}"))
}

fn load_ir(ir_file: &str) -> Result<CompiledClass> {
    eprintln!("Loading compiled class: {}", ir_file);

    let json = fs::read_to_string(ir_file).with_context(|| format!("reading {ir_file}"))?;
    let class = CompiledClass::from_json(&json).with_context(|| format!("loading {ir_file}"))?;

    eprintln!(
        "Loaded {} with {} functions and {} statements",
        class.name,
        class.functions.len(),
        class.statements.len()
    );

    Ok(class)
}

fn generate(
    class: &CompiledClass,
    filter: Option<&str>,
    options: &BackendOptions,
    log_level: LogLevel,
) -> Result<GeneratedClass> {
    let logger = StderrLogger::new(log_level);
    generate_functions(class, options, &logger, |desc| {
        filter.is_none_or(|f| desc.name.contains(f))
    })
    .with_context(|| format!("generating {}", class.name))
}

fn run_emit(
    ir_file: &str,
    filter: Option<String>,
    output: OutputStream,
    log_level: LogLevel,
    options: &BackendOptions,
) -> Result<()> {
    let class = load_ir(ir_file)?;
    let generated = generate(&class, filter.as_deref(), options, log_level)?;

    match output {
        OutputStream::Header => print!("{}", generated.header),
        OutputStream::Body => print!("{}", generated.body),
        OutputStream::Both => {
            println!("// {}.h", class.name);
            print!("{}", generated.header);
            println!();
            println!("// {}.cpp", class.name);
            print!("{}", generated.body);
        }
    }

    let failed = generated.reports.iter().filter(|r| r.error.is_some()).count();
    eprintln!(
        "Generated {} functions ({} failed)",
        generated.reports.len(),
        failed
    );
    Ok(())
}

fn generate_csv(reports: &[FunctionReport]) -> String {
    let mut output =
        String::from("function_name,ubergraph,execution_groups,statements,strategies,error\n");
    for report in reports {
        let strategies: Vec<String> = report.strategies.iter().map(|s| s.to_string()).collect();
        output.push_str(&format!(
            "\"{}\",{},{},{},{},\"{}\"\n",
            report.name.replace('\"', "\"\""),
            report.is_ubergraph,
            report.execution_groups,
            report.statements,
            strategies.join(";"),
            report.error.as_deref().unwrap_or("").replace('\"', "\"\"")
        ));
    }
    output
}

fn run_stats(ir_file: &str, filter: Option<String>, output: Option<String>) -> Result<()> {
    let class = load_ir(ir_file)?;
    // Errors still reach stderr; the CSV error column only holds why a function failed
    let generated = generate(
        &class,
        filter.as_deref(),
        &BackendOptions::default(),
        LogLevel::Error,
    )?;

    let csv_output = generate_csv(&generated.reports);

    if let Some(output_path) = output {
        fs::write(&output_path, csv_output)
            .with_context(|| format!("writing CSV file {output_path}"))?;
        eprintln!("CSV written to: {}", output_path);
    } else {
        print!("{}", csv_output);
    }
    eprintln!("Processed {} functions", generated.reports.len());
    Ok(())
}
