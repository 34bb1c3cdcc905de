use console::Style;
use coreg_core::align::{FrameReport, Verdict};
use coreg_core::config::{AlignmentConfig, RegistrationMethod};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    failure: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            failure: Style::new().red(),
        }
    }
}

pub fn print_config_summary(config: &AlignmentConfig, frames: usize, dim: (usize, usize)) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Stack Alignment"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!("{frames} ({} x {})", dim.1, dim.0))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Reference"),
        s.value.apply_to(config.reference_index)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Estimate on"),
        s.value
            .apply_to(format!("{} [channel {}]", config.layer, config.channel))
    );
    println!();

    println!("  {}", s.header.apply_to("Registration"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(&config.algorithm)
    );
    print_method_params(&s, &config.algorithm);
    println!();

    println!("  {}", s.header.apply_to("Resampling"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Kernel"),
        s.method.apply_to(config.interpolation)
    );
    println!(
        "    {:<12}{:?}",
        s.label.apply_to("Border"),
        config.border
    );
    for (name, kind) in &config.layers {
        println!(
            "    {:<12}{}",
            s.label.apply_to(name),
            s.value.apply_to(kind)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Plausibility"));
    let p = &config.plausibility;
    println!(
        "    {:<12}{}",
        s.label.apply_to("Rotation"),
        s.value.apply_to(format!("<= {:.1} deg", p.max_rotation_deg))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Scale"),
        s.value.apply_to(format!("{:.2} - {:.2}", p.min_scale, p.max_scale))
    );
    match p.max_translation {
        Some(limit) => println!(
            "    {:<12}{}",
            s.label.apply_to("Translation"),
            s.value.apply_to(format!("<= {limit:.1} px"))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Translation"),
            s.disabled.apply_to("unbounded")
        ),
    }
    println!();
}

fn print_method_params(s: &Styles, method: &RegistrationMethod) {
    match method {
        RegistrationMethod::Correlation(c) => {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Min Peak"),
                s.value.apply_to(c.min_confidence)
            );
        }
        RegistrationMethod::Intensity(c) => {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Iterations"),
                s.value.apply_to(c.max_iterations)
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Epsilon"),
                s.value.apply_to(format!("{:e}", c.convergence_epsilon))
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Smoothing"),
                s.value.apply_to(format!("sigma {}", c.gaussian_sigma))
            );
        }
        RegistrationMethod::Feature(c) => {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Keypoints"),
                s.value.apply_to(c.max_keypoints)
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Ratio"),
                s.value.apply_to(c.ratio_test)
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("RANSAC"),
                s.value.apply_to(format!(
                    "{} px, {} iterations",
                    c.ransac_threshold, c.max_iterations
                ))
            );
        }
    }
}

/// One line per frame: verdict, applied transform, confidence and the
/// failure reason for degraded frames.
pub fn print_frame_table(reports: &[FrameReport]) {
    let s = Styles::new();

    println!();
    println!(
        "  {:>5}  {:<10} {:<10} {}",
        s.header.apply_to("Frame"),
        s.header.apply_to("Verdict"),
        s.header.apply_to("Confidence"),
        s.header.apply_to("Transform")
    );
    for report in reports {
        let confidence = report
            .confidence()
            .map(|c| format!("{c:.4}"))
            .unwrap_or_else(|| "-".to_string());
        let verdict_text = format!("{:<10}", report.verdict.to_string());
        let verdict = match report.verdict {
            Verdict::Reference => s.label.apply_to(verdict_text),
            Verdict::Accepted => s.method.apply_to(verdict_text),
            Verdict::Degraded => s.failure.apply_to(verdict_text),
        };
        println!(
            "  {:>5}  {} {:<10} {}",
            report.index,
            verdict,
            confidence,
            report.transform
        );
        if let Some(ref failure) = report.failure {
            println!("         {}", s.disabled.apply_to(failure));
        }
    }

    let degraded = reports
        .iter()
        .filter(|r| r.verdict == Verdict::Degraded)
        .count();
    println!();
    if degraded > 0 {
        println!(
            "  {}",
            s.failure.apply_to(format!(
                "{degraded} of {} frames fell back to identity",
                reports.len()
            ))
        );
    } else {
        println!(
            "  {}",
            s.method.apply_to(format!("All {} frames registered", reports.len()))
        );
    }
    println!();
}
