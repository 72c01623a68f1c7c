use vizboard::chart::create_example_charts;

fn main() {
    let examples = create_example_charts();

    for (kind, path) in examples {
        println!("Created {} chart at {}", kind, path);
    }
}
