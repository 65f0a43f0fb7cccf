//! Inline stylesheet, script and HTML templates of the report.

/// Stylesheet shared by every document
pub const CSS: &str = r#"
body { font-family: -apple-system, "Segoe UI", Arial, sans-serif; margin: 16px; color: #222; }
h2.test-name { font-size: 18px; margin-bottom: 8px; word-break: break-all; }
.muted { color: #777; }
.attempt-chain { margin: 8px 0 16px; font-size: 14px; }
.attempt-badge { display: inline-block; padding: 2px 8px; border-radius: 10px; font-weight: 600; }
.attempt-badge.failed { background: #fdecea; color: #c0392b; }
.attempt-badge.passed { background: #e8f6ec; color: #1e8449; }
.arrow { margin: 0 6px; color: #999; }
.retry-insight { background: #fff8e1; border-left: 4px solid #f1c40f; padding: 8px 12px; margin-bottom: 16px; }
.retry-insight ul { margin: 4px 0 0; padding-left: 18px; }
.tabs { border-bottom: 1px solid #ddd; margin-bottom: 8px; }
.tab { border: 1px solid #ddd; border-bottom: none; background: #f7f7f7; padding: 6px 12px; cursor: pointer; }
.tab.active { background: #fff; font-weight: 600; }
.card { display: none; border: 1px solid #eee; padding: 12px; }
.card.active { display: block; }
.attempt-facts th { text-align: left; padding-right: 16px; vertical-align: top; }
.attempt-facts pre { margin: 0; white-space: pre-wrap; }
.panel-btn { margin-top: 10px; padding: 6px 10px; cursor: pointer; }
.failure-panel { border: 1px dashed #c0392b; padding: 10px; margin-top: 10px; }
.failure-panel img { max-width: 100%; border: 1px solid #ddd; }
pre.console { background: #272822; color: #f8f8f2; padding: 8px; overflow-x: auto; }
.trace-cmd { background: #f4f4f4; padding: 6px; white-space: pre-wrap; word-break: break-all; }
.trace-cmd.flash { background: #d4efdf; }
button.copied { background: #d4efdf; }
details.attempt-diff { margin: 6px 0; }
details.attempt-diff pre { background: #f7f7f7; padding: 6px; white-space: pre-wrap; }
"#;

/// Tab and panel toggling, copy buttons
pub const SCRIPT: &str = r"
function show(id) {
    document.querySelectorAll('.card').forEach(e => e.classList.remove('active'));
    document.querySelectorAll('.tab').forEach(e => e.classList.remove('active'));
    document.getElementById('attempt-' + id).classList.add('active');
    document.getElementById('tab-' + id).classList.add('active');
}

function togglePanel(id) {
    const panel = document.getElementById('panel-' + id);
    panel.style.display = panel.style.display === 'block' ? 'none' : 'block';
}

function copyTraceCmd(button, id) {
    const cmd = document.getElementById(id);
    navigator.clipboard.writeText(cmd.innerText).then(() => {
        const original = button.innerText;
        button.innerText = '✅ Copied';
        button.classList.add('copied');
        cmd.classList.add('flash');
        setTimeout(() => {
            button.innerText = original;
            button.classList.remove('copied');
            cmd.classList.remove('flash');
        }, 2000);
    }).catch(err => alert('❌ Copy failed: ' + err));
}
";

/// Whole attempt summary document
pub const SUMMARY: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>{{css}}</style>
</head>
<body>
<h2 class="test-name">{{title}}</h2>
{{chain}}
{{insight}}
<div class="tabs">{{tabs}}</div>
<div class="cards">{{cards}}</div>
{{diff}}
<script>{{script}}
window.onload = function () { show({{initial}}); };
</script>
</body>
</html>
"#;

/// Chain of badges for mixed outcomes
pub const CHAIN: &str = r#"<div class="attempt-chain">🔁 {{chain}}</div>"#;

/// One chain badge
pub const BADGE: &str = r#"<span class="attempt-badge {{status}}">Attempt {{aid}} {{icon}}</span>"#;

/// Retry insight block
pub const INSIGHT: &str = r#"<div class="retry-insight"><b>🔍 Retry Insight</b><ul>{{items}}</ul></div>"#;

/// One tab button
pub const TAB: &str = r#"<button type="button" class="tab {{active}}" id="tab-{{aid}}" onclick="show({{aid}})">Attempt {{aid}} {{icon}}</button>"#;

/// One attempt card
pub const CARD: &str = r#"<div class="card {{active}}" id="attempt-{{aid}}">
<h3>{{status}}</h3>
<table class="attempt-facts">
<tr><th>Duration</th><td>{{duration}}</td></tr>
<tr><th>Error</th><td><pre>{{error}}</pre></td></tr>
<tr><th>URL</th><td>{{url}}</td></tr>
<tr><th>Screenshot</th><td>{{screenshot}}</td></tr>
<tr><th>Video</th><td>{{video}}</td></tr>
<tr><th>Trace</th><td>{{trace}}</td></tr>
</table>
{{panel_button}}
{{failure_panel}}
</div>
"#;

/// Button revealing a failure panel
pub const PANEL_BUTTON: &str = r#"<button type="button" onclick="togglePanel({{aid}});return false;" class="panel-btn">🖲️ View Failure Panel (Attempt {{aid}})</button>"#;

/// Failure panel of one attempt
pub const FAILURE_PANEL: &str = r#"<div class="failure-panel" id="panel-{{aid}}" style="display:{{display}}">
<h4>Failure Panel (Attempt {{aid}})</h4>
<p><b>Page URL:</b> {{url_link}}</p>
<h5>Console Errors</h5>
<pre class="console">{{console}}</pre>
<h5>Screenshot</h5>
{{screenshot}}
<h5>Video</h5>
<p class="muted">{{video_note}}</p>
{{trace_block}}
</div>
"#;

/// Copyable trace-viewer commands
pub const TRACE_BLOCK: &str = r#"<div class="trace-block">
<h5>Trace</h5>
<p class="muted">Run from any shell to open the trace viewer:</p>
<pre class="trace-cmd" id="trace-cmd-{{aid}}-ps">{{powershell}}</pre>
<button type="button" onclick="copyTraceCmd(this, 'trace-cmd-{{aid}}-ps')">📋 Copy Windows PowerShell Command</button>
<pre class="trace-cmd" id="trace-cmd-{{aid}}-cmd">{{cmd}}</pre>
<button type="button" onclick="copyTraceCmd(this, 'trace-cmd-{{aid}}-cmd')">📋 Copy Windows CMD Command</button>
<pre class="trace-cmd" id="trace-cmd-{{aid}}-unix">{{unix}}</pre>
<button type="button" onclick="copyTraceCmd(this, 'trace-cmd-{{aid}}-unix')">📋 Copy macOS / Linux Command</button>
</div>
"#;

/// One diff section
pub const DIFF: &str = r#"<details class="attempt-diff" open><summary>{{summary}}</summary><pre>{{content}}</pre></details>
"#;

/// Diff section wrapper
pub const DIFF_VIEW: &str = r#"<div class="attempt-diff-view"><h3>🧬 What Changed Between Attempts</h3>
{{sections}}</div>
"#;

/// Standalone document wrapping one fragment
pub const STANDALONE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>{{css}}</style>
</head>
<body>
{{body}}
<script>{{script}}</script>
</body>
</html>
"#;

/// Trace viewer instructions body
pub const TRACE_VIEWER: &str = r#"<h3>Trace Viewer</h3>
<p>This trace is already extracted.</p>
<p><b>Serve it locally:</b></p>
<pre class="trace-cmd">{{serve}}</pre>
<p>Then open:</p>
<pre class="trace-cmd">http://localhost:{{port}}</pre>
"#;

/// Trace command document body
pub const TRACE_COMMAND: &str = r#"<h3>Open Trace</h3>
{{trace_block}}
"#;
