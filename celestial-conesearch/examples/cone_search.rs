use celestial_conesearch::query::{Cone, Dataset};

fn main() -> anyhow::Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        anyhow::bail!("Usage: cone_search <catalog-dir>");
    };

    let dataset = Dataset::open(&path)?;
    println!("nside {} with {} fields", dataset.nside(), dataset.fields().len());

    let cone = Cone::new(83.633, -5.375, 0.5)?;
    let rows = dataset.cone_search(&cone).collect::<Result<Vec<_>, _>>()?;
    println!(
        "\n{} rows within {:.1}° of ({:.3}, {:.3}):\n",
        rows.len(),
        cone.radius_deg(),
        cone.ra_deg(),
        cone.dec_deg(),
    );

    for row in rows.iter().take(20) {
        println!("  {}", row.join("  "));
    }

    Ok(())
}
