//! Operator dashboard served at `/`.

use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>WA Gateway</title>
    <style>
        body { background: #0f172a; color: #e2e8f0; font-family: system-ui, sans-serif; max-width: 720px; margin: 40px auto; padding: 0 20px; }
        h1 { color: #818cf8; }
        section { background: rgba(255, 255, 255, 0.05); border: 1px solid rgba(255, 255, 255, 0.15); border-radius: 12px; padding: 20px; margin-bottom: 24px; }
        input, button { font: inherit; padding: 8px 12px; border-radius: 8px; border: 1px solid #334155; margin: 4px 0; }
        input { background: #1e293b; color: inherit; width: 100%; box-sizing: border-box; }
        button { background: #6366f1; color: white; cursor: pointer; border: none; }
        pre { white-space: pre-wrap; word-break: break-all; background: #1e293b; padding: 12px; border-radius: 8px; }
        .ready { color: #4ade80; }
        .waiting { color: #facc15; }
    </style>
</head>
<body>
    <h1>WA Gateway</h1>

    <section>
        <h2>Link a school</h2>
        <input id="schoolId" placeholder="School ID, e.g. school_001">
        <button onclick="initSchool()">Initialize</button>
        <p id="status">Enter a school ID to begin.</p>
        <pre id="qr" hidden></pre>
    </section>

    <section>
        <h2>Test alert</h2>
        <input id="phoneNumber" placeholder="Phone number, e.g. 923001234567">
        <input id="studentName" placeholder="Student name">
        <input id="amount" placeholder="Amount">
        <input id="dueDate" placeholder="Due date">
        <button onclick="sendAlert()">Send</button>
        <p id="sendResult"></p>
    </section>

    <script>
        let poller = null;

        async function initSchool() {
            const schoolId = document.getElementById('schoolId').value.trim();
            const res = await fetch('/api/init', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ schoolId })
            });
            const data = await res.json();
            document.getElementById('status').textContent = data.success ? data.message : data.error;
            if (data.success) {
                clearInterval(poller);
                poller = setInterval(() => pollStatus(schoolId), 3000);
            }
        }

        async function pollStatus(schoolId) {
            const res = await fetch('/api/status/' + encodeURIComponent(schoolId));
            const data = await res.json();
            const status = document.getElementById('status');
            const qr = document.getElementById('qr');
            if (!data.exists) {
                status.textContent = 'Session not running. Initialize again.';
                qr.hidden = true;
            } else if (data.isReady) {
                status.innerHTML = '<span class="ready">Linked and ready to send.</span>';
                qr.hidden = true;
                clearInterval(poller);
            } else if (data.qrCode) {
                status.innerHTML = '<span class="waiting">Scan this pairing code from WhatsApp &gt; Linked devices.</span>';
                qr.textContent = data.qrCode;
                qr.hidden = false;
            } else {
                status.textContent = 'Starting session...';
            }
        }

        async function sendAlert() {
            const body = {
                schoolId: document.getElementById('schoolId').value.trim(),
                phoneNumber: document.getElementById('phoneNumber').value.trim(),
                studentName: document.getElementById('studentName').value.trim(),
                amount: document.getElementById('amount').value.trim(),
                dueDate: document.getElementById('dueDate').value.trim()
            };
            document.getElementById('sendResult').textContent = 'Sending...';
            const res = await fetch('/api/send', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(body)
            });
            const data = await res.json();
            document.getElementById('sendResult').textContent = data.success ? 'Sent.' : 'Failed: ' + data.error;
        }
    </script>
</body>
</html>
"#;
