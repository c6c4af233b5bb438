// build.rs
fn main() {
    #[cfg(windows)]
    {
        let mut res = winres::WindowsResource::new();
        res.set_icon("assets/otto_fmt.ico");
        res.compile().unwrap();
    }
}
