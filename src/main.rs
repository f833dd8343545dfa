use clap::Parser;
use rotor_results::{
    Results,
    cli::{Cli, Command},
};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Info { file } => {
            let results = Results::load(&file)?;
            print!("{results}");
        }
        Command::Plot(args) => {
            let results = Results::load(&args.file)?;
            let rendered = results.plot(&args.selection(), &args.render_config())?;
            if let Some(path) = &args.svg {
                rendered.static_plot.save(path)?;
            }
            if args.show {
                rendered.interactive.show()?;
            }
        }
        Command::Convert { file, out } => {
            Results::load(&file)?.save(&out)?;
            log::info!("{file:?} saved into {out:?}");
        }
    }

    Ok(())
}
