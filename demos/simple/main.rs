use tabflow::{ChannelEvent, ChannelOptions, Config, EngineBuilder, RunOptions, Workflow};

fn main() {
    let config_str = include_str!("./config.toml");

    let config = Config::load_from_str(config_str).unwrap();

    let engine = EngineBuilder::from_config(&config).build().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("pivot.csv");
    std::fs::write(&input, include_str!("./sales.csv")).unwrap();

    let text = include_str!("./workflow.json");

    let workflow = Workflow::from_json(text).unwrap();

    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_node(move |nid, event| {
        println!("{:>8} {}", nid, event.str());
    });

    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_error(move |e| {
        println!("Node failed: {:?}", e.inner());
    });

    let options = RunOptions::new().with_flow_override("input", input.to_str().unwrap()).with_flow_override("output", output.to_str().unwrap());

    let handle = engine.start(&workflow, options).unwrap();
    println!("Run started, id: {}", handle.id());

    let report = loop {
        if let Some(report) = handle.try_report() {
            break report;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    };
    println!("Run finished: {}", report.status.as_ref());

    if let Some(table) = report.artifact("pivot") {
        println!("{:?}", table.columns());
        for row in table.rows() {
            println!("{:?}", row);
        }
    }

    println!("{}", std::fs::read_to_string(&output).unwrap());
}
