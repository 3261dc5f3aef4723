use std::error::Error;

use classad::{parse, Expression, Value};

/// Minimal matchmaking example: a job ad's `Rank` expression reads attributes off
/// both itself (`my`) and the machine ad it's being matched against (`target`).
fn main() -> Result<(), Box<dyn Error>> {
    let job = parse(
        r#"[
            Requirements = TARGET.HasGpu && TARGET.Memory > 2048;
            Rank = TARGET.Memory + TARGET.Mips
        ]"#,
    )?;
    let Expression::RecordLit(job) = job else {
        unreachable!("top-level parse of a bracketed record always yields RecordLit")
    };

    let machine = parse("[Memory = 4096; Mips = 1200; HasGpu = true]")?;
    let Expression::RecordLit(machine) = machine else {
        unreachable!()
    };

    let requirements = job.evaluate("Requirements", None, Some(&machine));
    let rank = job.evaluate("Rank", None, Some(&machine));

    println!("Requirements -> {requirements}");
    println!("Rank -> {rank}");

    assert_eq!(requirements, Value::Bool(true));
    assert_eq!(rank, Value::Int(5296));

    Ok(())
}
