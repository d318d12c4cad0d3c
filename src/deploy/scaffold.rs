//! Fixed repository files written ahead of every bundle.

use crate::config::PagesWorkflow;

pub const LICENSE_PATH: &str = "LICENSE";
pub const README_PATH: &str = "README.md";
pub const WORKFLOW_PATH: &str = ".github/workflows/pages.yml";
pub const GITIGNORE_PATH: &str = ".gitignore";

const MIT_LICENSE: &str = "MIT License

Copyright (c) {year} {owner}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
";

const PAGES_WORKFLOW_HEADER: &str = "name: GitHub Pages

on:
  push:
    branches: [ main ]
  workflow_dispatch:

permissions:
  contents: read
  pages: write
  id-token: write

concurrency:
  group: pages
  cancel-in-progress: true

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
";

const CONFIGURE_PAGES_STEP: &str = "      - uses: actions/configure-pages@v5
        with:
          enablement: true
";

const PAGES_WORKFLOW_FOOTER: &str = "      - name: Upload artifact
        uses: actions/upload-pages-artifact@v3
        with:
          path: ./
  deploy:
    needs: build
    runs-on: ubuntu-latest
    environment:
      name: github-pages
      url: ${{ steps.deployment.outputs.page_url }}
    steps:
      - id: deployment
        uses: actions/deploy-pages@v4
";

const GITIGNORE: &str = ".DS_Store
node_modules/
*.log
.env
";

/// One scaffolding write: destination path, content and commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldFile {
    pub path: &'static str,
    pub content: String,
    pub message: String,
}

/// Inputs rendered into the scaffolding files.
#[derive(Debug, Clone)]
pub struct ScaffoldContext<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub task: &'a str,
    pub round: i64,
    pub brief: &'a str,
    pub pages_url: &'a str,
    pub year: i32,
}

pub fn render_license(year: i32, owner: &str) -> String {
    MIT_LICENSE
        .replace("{year}", &year.to_string())
        .replace("{owner}", owner)
}

pub fn render_readme(ctx: &ScaffoldContext<'_>) -> String {
    format!(
        "# {repo}\n\nAutomated app for `{task}` (round {round}).\n\nPages: {pages}\n\n## Brief\n\n{brief}\n\n## License\n\nMIT\n",
        repo = ctx.repo,
        task = ctx.task,
        round = ctx.round,
        pages = ctx.pages_url,
        brief = ctx.brief,
    )
}

pub fn render_workflow(variant: PagesWorkflow) -> String {
    let mut workflow = String::from(PAGES_WORKFLOW_HEADER);
    if variant == PagesWorkflow::V2 {
        workflow.push_str(CONFIGURE_PAGES_STEP);
    }
    workflow.push_str(PAGES_WORKFLOW_FOOTER);
    workflow
}

/// Scaffolding files in commit order: license, readme, workflow, then the
/// optional `.gitignore`.
pub fn scaffold_files(
    ctx: &ScaffoldContext<'_>,
    variant: PagesWorkflow,
    include_gitignore: bool,
) -> Vec<ScaffoldFile> {
    let mut files = vec![
        ScaffoldFile {
            path: LICENSE_PATH,
            content: render_license(ctx.year, ctx.owner),
            message: format!("[{}] Add LICENSE", ctx.task),
        },
        ScaffoldFile {
            path: README_PATH,
            content: render_readme(ctx),
            message: format!("[{}] Update README", ctx.task),
        },
        ScaffoldFile {
            path: WORKFLOW_PATH,
            content: render_workflow(variant),
            message: format!("[{}] Ensure Pages workflow", ctx.task),
        },
    ];
    if include_gitignore {
        files.push(ScaffoldFile {
            path: GITIGNORE_PATH,
            content: GITIGNORE.to_string(),
            message: format!("[{}] Add .gitignore", ctx.task),
        });
    }
    files
}
