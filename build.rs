fn main() {
    println!("cargo:rerun-if-changed=frontend/");

    // The embed macro needs the folder to exist even when the front-end has
    // not been built yet; seed a placeholder page in that case.
    let frontend_path = std::path::Path::new("frontend");
    if !frontend_path.exists() {
        std::fs::create_dir_all("frontend").ok();
        std::fs::write(
            "frontend/index.html",
            concat!(
                "<!DOCTYPE html>\n<html>\n<head><title>HTTP Inspector</title></head>\n",
                "<body>\n<h1>HTTP Inspector backend</h1>\n",
                "<p>The API is running, but no front-end build is embedded.</p>\n",
                "<p>Build the front-end and copy its dist output into <code>frontend/</code>, ",
                "then rebuild.</p>\n</body>\n</html>\n",
            ),
        )
        .ok();
    }
}
