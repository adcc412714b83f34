use std::env;
use std::fs::File;
use std::io::BufReader;

use cellsets::Membership;
use cellsets::Path;
use cellsets::Resolver;
use cellsets::SetTree;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let src = env::args().nth(1).expect("missing src");

    let paths = env::args()
        .skip(2)
        .map(|s| {
            s.parse::<Path>()
                .unwrap_or_else(|_| panic!("could not parse path: {s}"))
        })
        .collect::<Vec<_>>();

    let tree: SetTree = File::open(src)
        .map(BufReader::new)
        .map(serde_json::from_reader)??;

    let membership = Membership::from_tree(&tree);
    let resolver = Resolver::new(Some(&membership), None);

    println!(
        "Indexed {} observations across {} root(s).",
        membership.len(),
        tree.roots().len()
    );

    for path in paths {
        let ids = resolver.resolve_path(&path);
        println!("{}: {} observation(s)", path, ids.len());
    }

    Ok(())
}
