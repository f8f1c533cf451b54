use std::path::Path;

use anyhow::Result;
use env_logger::Env;
use mesh_cgh::geom::Mesh;
use mesh_cgh::output;
use mesh_cgh::problem::Problem;
use mesh_cgh::settings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = settings::load_config()?;
    let mesh = Mesh::from_obj(&settings.geom_name)?;
    let problem = Problem::new(mesh, settings);

    let hologram = problem.generate_hologram()?;
    println!("{}", hologram);

    output::write_summary(&hologram, &problem.settings, Path::new(&problem.settings.directory))?;

    Ok(())
}
