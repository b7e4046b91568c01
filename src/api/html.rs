// Single-page shell served at `/`. The diagram widget is loaded from a CDN;
// projection happens server-side in /api/graph.
pub const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Cypher-Lens</title>
<script src="https://unpkg.com/cytoscape@3/dist/cytoscape.min.js"></script>
<style>
  body { font-family: system-ui, sans-serif; background: #f9fafb; margin: 0; padding: 16px; }
  main { max-width: 960px; margin: 0 auto; }
  h1 { text-align: center; }
  textarea { width: 100%; height: 12rem; font-family: monospace; font-size: 14px; box-sizing: border-box; }
  button { margin-top: 12px; padding: 8px 16px; background: #2563eb; color: #fff; border: 0; border-radius: 4px; }
  button:disabled { opacity: 0.5; }
  #error { color: #dc2626; }
  #graph { width: 100%; height: 24rem; background: #fff; border: 1px solid #e5e7eb; }
  table { border-collapse: collapse; background: #fff; width: 100%; }
  th, td { border-bottom: 1px solid #e5e7eb; padding: 6px 12px; text-align: left; font-size: 13px; }
  th { background: #f3f4f6; }
</style>
</head>
<body>
<main>
  <h1>Cypher-Lens</h1>
  <section>
    <h2>Cypher Query Editor</h2>
    <textarea id="query">MATCH (n)-[r]->(m) RETURN n, r, m LIMIT 25</textarea>
    <button id="run">Execute Query</button>
    <p id="error"></p>
  </section>
  <section>
    <h2>Graph Visualization</h2>
    <p id="graph-empty">No graph to display. Execute a query to see the visualization.</p>
    <div id="graph" hidden></div>
  </section>
  <section>
    <h2>Results Table</h2>
    <div id="table"><p>No results to display.</p></div>
  </section>
</main>
<script>
const $ = (id) => document.getElementById(id);

function renderTable(records) {
  const host = $('table');
  if (!records.length) { host.innerHTML = '<p>No results to display.</p>'; return; }
  const headers = Object.keys(records[0]);
  const table = document.createElement('table');
  const head = table.createTHead().insertRow();
  headers.forEach((h) => { const th = document.createElement('th'); th.textContent = h; head.appendChild(th); });
  const body = table.createTBody();
  records.forEach((record) => {
    const row = body.insertRow();
    headers.forEach((h) => {
      const v = record[h];
      row.insertCell().textContent = (v === null || v === undefined) ? 'null' : JSON.stringify(v);
    });
  });
  host.replaceChildren(table);
}

function renderGraph(elements) {
  const empty = !elements.length;
  $('graph-empty').hidden = !empty;
  $('graph').hidden = empty;
  if (empty) return;
  cytoscape({
    container: $('graph'),
    elements: elements.map((data) => ({ data })),
    layout: { name: 'cose', animate: true },
    style: [
      { selector: 'node', style: { 'background-color': '#0074D9', label: 'data(label)', color: '#fff',
        'text-valign': 'center', 'text-halign': 'center', 'font-size': '12px' } },
      { selector: 'edge', style: { width: 2, 'line-color': '#ccc', 'target-arrow-color': '#ccc',
        'target-arrow-shape': 'triangle', 'curve-style': 'bezier', label: 'data(label)',
        'font-size': '10px', 'text-rotation': 'autorotate' } },
    ],
  });
}

async function execute() {
  const button = $('run');
  button.disabled = true;
  button.textContent = 'Executing...';
  $('error').textContent = '';
  renderTable([]);
  renderGraph([]);
  try {
    const resp = await fetch('/api/graph', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ query: $('query').value }),
    });
    const data = await resp.json();
    if (data.error) {
      $('error').textContent = 'Error: ' + data.error;
    } else {
      renderTable(data.records);
      renderGraph(data.elements);
    }
  } catch (err) {
    $('error').textContent = 'Error: ' + (err.message || 'An error occurred');
  } finally {
    button.disabled = false;
    button.textContent = 'Execute Query';
  }
}

$('run').addEventListener('click', execute);
</script>
</body>
</html>
"#;
