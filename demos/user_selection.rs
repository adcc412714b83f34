use cellsets::Path;
use cellsets::Resolver;
use cellsets::intersection::add_selection;
use cellsets::membership::Membership;
use cellsets::tree::SetNode;
use cellsets::tree::SetTree;
use cellsets::tree::algebra;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let canonical = SetTree::new([SetNode::interior(
        "Leiden",
        [
            SetNode::leaf("1", ["a", "b", "c"]),
            SetNode::leaf("2", ["d", "e"]),
            SetNode::leaf("3", ["f"]),
        ],
    )]);

    let mut user = SetTree::default();
    let lasso = add_selection(&mut user, canonical.roots(), None, ["b", "c", "d"], None);
    let named = add_selection(
        &mut user,
        canonical.roots(),
        Some(String::from("Outliers")),
        ["f"],
        None,
    );

    for (path, node) in user.nodes() {
        let depth = path.len() - 1;
        println!(
            "{:indent$}{} ({} observation(s))",
            "",
            node.name(),
            node.flatten_leaf_set().len(),
            indent = depth * 2
        );
    }

    let membership = Membership::from_tree(&canonical);
    let resolver = Resolver::new(Some(&membership), Some(&user));

    let sets = resolver.resolve_all(&[lasso, named, "Leiden/1".parse::<Path>()?]);
    println!("union: {:?}", algebra::union(&sets));
    println!("intersection: {:?}", algebra::intersection(&sets));

    println!("{}", serde_json::to_string_pretty(&user)?);

    Ok(())
}
